// =============================================================================
// Board coordinates
//
// Row 0 is rank 8 and row 7 is rank 1, so a board diagram reads top to bottom
// the way it is stored. File 0 is the A file. "Up" moves toward rank 8.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChessError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    row: u8,
    file: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::UpLeft,
        Direction::UpRight,
        Direction::DownLeft,
        Direction::DownRight,
    ];
    pub const STRAIGHT: [Direction; 4] =
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right];
    pub const DIAGONAL: [Direction; 4] =
        [Direction::UpLeft, Direction::UpRight, Direction::DownLeft, Direction::DownRight];

    /// (row delta, file delta) in internal coordinates.
    pub fn delta(self) -> (i8, i8) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
            Direction::UpLeft => (-1, -1),
            Direction::UpRight => (-1, 1),
            Direction::DownLeft => (1, -1),
            Direction::DownRight => (1, 1),
        }
    }
}

impl Position {
    /// Build from internal zero-based coordinates.
    pub fn at(row: usize, file: usize) -> Option<Position> {
        if row < 8 && file < 8 {
            Some(Position { row: row as u8, file: file as u8 })
        } else {
            None
        }
    }

    /// Build from a rank (1-8) and a file letter (A-H).
    pub fn from_rank_file(rank: u8, file: char) -> Option<Position> {
        if !(1..=8).contains(&rank) || !('A'..='H').contains(&file) {
            return None;
        }
        Position::at(8 - rank as usize, file as usize - 'A' as usize)
    }

    /// Parse the two-character notation, e.g. "E4". Only upper-case files are
    /// accepted and nothing may follow the rank digit.
    pub fn from_notation(text: &str) -> Result<Position, ChessError> {
        let bytes = text.as_bytes();
        if bytes.len() != 2 {
            return Err(ChessError::InvalidPosition(text.to_string()));
        }
        let file = bytes[0] as char;
        let rank = bytes[1] as char;
        let rank = rank.to_digit(10).unwrap_or(0) as u8;
        Position::from_rank_file(rank, file).ok_or_else(|| ChessError::InvalidPosition(text.to_string()))
    }

    pub fn notation(&self) -> String {
        format!("{}{}", self.file_char(), self.rank())
    }

    pub fn row(&self) -> usize {
        self.row as usize
    }

    pub fn file(&self) -> usize {
        self.file as usize
    }

    /// Human rank, 1-8.
    pub fn rank(&self) -> u8 {
        8 - self.row
    }

    pub fn file_char(&self) -> char {
        (b'A' + self.file) as char
    }

    /// Shift by a row/file delta in internal coordinates; `None` off the board.
    pub fn offset(&self, drow: i8, dfile: i8) -> Option<Position> {
        let row = self.row as i8 + drow;
        let file = self.file as i8 + dfile;
        if (0..8).contains(&row) && (0..8).contains(&file) {
            Some(Position { row: row as u8, file: file as u8 })
        } else {
            None
        }
    }

    pub fn neighbor(&self, direction: Direction) -> Option<Position> {
        let (dr, df) = direction.delta();
        self.offset(dr, df)
    }

    pub fn up(&self) -> Option<Position> {
        self.neighbor(Direction::Up)
    }

    pub fn down(&self) -> Option<Position> {
        self.neighbor(Direction::Down)
    }

    pub fn left(&self) -> Option<Position> {
        self.neighbor(Direction::Left)
    }

    pub fn right(&self) -> Option<Position> {
        self.neighbor(Direction::Right)
    }

    pub fn is_same_rank(&self, other: Position) -> bool {
        self.row == other.row
    }

    pub fn is_same_file(&self, other: Position) -> bool {
        self.file == other.file
    }

    pub fn is_diagonal(&self, other: Position) -> bool {
        let (dr, df) = self.distance(other);
        dr != 0 && dr.abs() == df.abs()
    }

    /// Signed (row, file) distance from `self` to `other`.
    pub fn distance(&self, other: Position) -> (i8, i8) {
        (other.row as i8 - self.row as i8, other.file as i8 - self.file as i8)
    }

    /// King-move distance.
    pub fn chebyshev(&self, other: Position) -> u8 {
        let (dr, df) = self.distance(other);
        dr.unsigned_abs().max(df.unsigned_abs())
    }

    /// Squares strictly between `self` and `other` along a shared rank, file
    /// or diagonal. Empty when the two are adjacent or not aligned.
    pub fn between(&self, other: Position) -> Vec<Position> {
        let (dr, df) = self.distance(other);
        let aligned = dr == 0 || df == 0 || dr.abs() == df.abs();
        if !aligned || (dr == 0 && df == 0) {
            return Vec::new();
        }
        let step = (dr.signum(), df.signum());
        let mut squares = Vec::new();
        let mut current = *self;
        while let Some(next) = current.offset(step.0, step.1) {
            if next == other {
                break;
            }
            squares.push(next);
            current = next;
        }
        squares
    }

    /// All 64 squares, A8 first, row by row.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..64u8).map(|i| Position { row: i / 8, file: i % 8 })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank())
    }
}

impl FromStr for Position {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::from_notation(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    #[test]
    fn notation_round_trips_every_square() {
        for p in Position::all() {
            assert_eq!(Position::from_notation(&p.notation()).unwrap(), p);
        }
        assert_eq!(Position::all().count(), 64);
    }

    #[test]
    fn internal_encoding_puts_rank_eight_on_row_zero() {
        assert_eq!((pos("A8").row(), pos("A8").file()), (0, 0));
        assert_eq!((pos("A1").row(), pos("A1").file()), (7, 0));
        assert_eq!((pos("H1").row(), pos("H1").file()), (7, 7));
    }

    #[test]
    fn malformed_notation_is_rejected() {
        for bad in ["", "A", "A0", "A9", "I1", "a1", "E44", "4E", " E4"] {
            assert!(
                matches!(Position::from_notation(bad), Err(ChessError::InvalidPosition(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn neighbors_stop_at_the_edge() {
        assert_eq!(pos("E4").up(), Some(pos("E5")));
        assert_eq!(pos("E4").down(), Some(pos("E3")));
        assert_eq!(pos("E4").left(), Some(pos("D4")));
        assert_eq!(pos("E4").neighbor(Direction::DownRight), Some(pos("F3")));
        assert_eq!(pos("A8").up(), None);
        assert_eq!(pos("A8").left(), None);
        assert_eq!(pos("H1").down(), None);
        assert_eq!(pos("H1").right(), None);
        assert_eq!(pos("H8").neighbor(Direction::UpRight), None);
    }

    #[test]
    fn between_lists_intervening_squares() {
        assert_eq!(pos("A1").between(pos("A4")), vec![pos("A2"), pos("A3")]);
        assert_eq!(pos("E1").between(pos("H1")), vec![pos("F1"), pos("G1")]);
        assert_eq!(pos("C1").between(pos("F4")), vec![pos("D2"), pos("E3")]);
        assert!(pos("A1").between(pos("B3")).is_empty());
        assert!(pos("A1").between(pos("A2")).is_empty());
    }
}
