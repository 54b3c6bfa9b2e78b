use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ChessError;
use crate::piece::{Color, Piece, PieceType};
use crate::position::Position;

/// Occupancy code of an empty square.
pub const EMPTY: i8 = 0;
/// Occupancy code of a square removed from play by a variant rule-set.
pub const DISABLED: i8 = -1;

/// Decoded occupancy code. `Empty` and `Disabled` are the two sentinels that
/// occupy a square without being a playable piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Square {
    Empty,
    Disabled,
    Occupied(Color, PieceType),
}

impl Square {
    pub fn from_code(code: i8) -> Square {
        match code {
            EMPTY => Square::Empty,
            c if c < 0 => Square::Disabled,
            c => {
                let color = if c >= Color::Black.code_offset() { Color::Black } else { Color::White };
                match PieceType::from_ordinal(c - color.code_offset()) {
                    Some(pt) => Square::Occupied(color, pt),
                    None => Square::Disabled,
                }
            }
        }
    }

    pub fn code(self) -> i8 {
        match self {
            Square::Empty => EMPTY,
            Square::Disabled => DISABLED,
            Square::Occupied(color, pt) => color.code_offset() + pt.ordinal(),
        }
    }
}

/// Hands out instance ids for promoted pieces, per color and type. Queens
/// start at 2 and the other promotion targets at 3, following the standard
/// layout. Owned by the board so each search branch counts on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionTracker {
    next: [[u8; 4]; 2],
}

impl Default for PromotionTracker {
    fn default() -> Self {
        PromotionTracker { next: [[2, 3, 3, 3]; 2] }
    }
}

impl PromotionTracker {
    pub fn next_id(&mut self, color: Color, piece_type: PieceType) -> u8 {
        let c = match color {
            Color::White => 0,
            Color::Black => 1,
        };
        let t = match piece_type {
            PieceType::Queen => 0,
            PieceType::Rook => 1,
            PieceType::Knight => 2,
            _ => 3,
        };
        let id = self.next[c][t];
        self.next[c][t] = id.saturating_add(1);
        id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    grid: [[i8; 8]; 8],
    pieces: Vec<Piece>,
    promotions: PromotionTracker,
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

impl Board {
    /// Create an empty board with no pieces. Useful for setting up test positions.
    pub fn empty() -> Self {
        Board {
            grid: [[EMPTY; 8]; 8],
            pieces: Vec::new(),
            promotions: PromotionTracker::default(),
        }
    }

    /// The classic starting layout. Pawns are numbered 1-8 from the A file;
    /// rooks, knights and bishops are 1 on the queen side and 2 on the king side.
    pub fn standard() -> Self {
        let mut board = Board::empty();
        for color in [Color::White, Color::Black] {
            let back_row = color.home_row();
            for (file, &pt) in BACK_RANK.iter().enumerate() {
                let id = if file < 4 { 1 } else { 2 };
                let id = if matches!(pt, PieceType::Queen | PieceType::King) { 1 } else { id };
                if let Some(start) = Position::at(back_row, file) {
                    board.place(Piece::new(pt, color, id, start));
                }
            }
            for file in 0..8 {
                if let Some(start) = Position::at(color.pawn_row(), file) {
                    board.place(Piece::pawn(color, file as u8 + 1, start));
                }
            }
        }
        board
    }

    pub fn get(&self, position: Position) -> i8 {
        self.grid[position.row()][position.file()]
    }

    /// Write one cell. Pieces are not touched; see [`Board::sync_pieces`].
    pub fn set(&mut self, position: Position, code: i8) {
        self.grid[position.row()][position.file()] = code;
    }

    pub fn square(&self, position: Position) -> Square {
        Square::from_code(self.get(position))
    }

    /// Anything but an empty square, disabled squares included.
    pub fn is_occupied(&self, position: Position) -> bool {
        self.get(position) != EMPTY
    }

    pub fn is_occupied_by(&self, position: Position, color: Color) -> bool {
        matches!(self.square(position), Square::Occupied(c, _) if c == color)
    }

    pub fn is_occupied_by_type(&self, position: Position, color: Color, piece_type: PieceType) -> bool {
        self.square(position) == Square::Occupied(color, piece_type)
    }

    pub fn is_disabled(&self, position: Position) -> bool {
        self.square(position) == Square::Disabled
    }

    /// Take a square out of play. Any piece standing there is dropped.
    pub fn disable(&mut self, position: Position) {
        self.set(position, DISABLED);
        self.sync_pieces();
    }

    pub fn active_pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.iter().filter(move |p| p.color == color)
    }

    pub fn piece_at(&self, position: Position) -> Option<&Piece> {
        let code = self.get(position);
        self.pieces.iter().find(|p| p.position == position && p.code() == code)
    }

    pub fn piece_at_mut(&mut self, position: Position) -> Option<&mut Piece> {
        let code = self.get(position);
        self.pieces.iter_mut().find(|p| p.position == position && p.code() == code)
    }

    /// Index of the active piece equal in value to `piece`.
    pub fn index_of(&self, piece: &Piece) -> Option<usize> {
        self.pieces.iter().position(|p| p == piece)
    }

    pub(crate) fn pieces_mut(&mut self) -> impl Iterator<Item = &mut Piece> + '_ {
        self.pieces.iter_mut()
    }

    pub(crate) fn king_mut(&mut self, color: Color) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| p.color == color && p.is_king())
    }

    pub fn find_piece(&self, color: Color, piece_type: PieceType, id: u8) -> Option<&Piece> {
        self.pieces
            .iter()
            .find(|p| p.color == color && p.piece_type() == piece_type && p.id == id)
    }

    pub fn king(&self, color: Color) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.color == color && p.is_king())
    }

    /// Put a piece on its current square, replacing whatever stood there.
    pub fn place(&mut self, piece: Piece) {
        self.pieces.retain(|p| p.position != piece.position);
        self.set(piece.position, piece.code());
        self.pieces.push(piece);
    }

    /// Move the piece standing on `from` to `to`: vacate the origin, write the
    /// piece's code on the destination and flip its has-moved flag. Whatever
    /// stood on `to` is left for [`Board::sync_pieces`] to prune.
    pub fn relocate(&mut self, from: Position, to: Position) -> bool {
        let Some(piece) = self.piece_at_mut(from) else {
            return false;
        };
        piece.position = to;
        piece.has_moved = true;
        let code = piece.code();
        self.set(from, EMPTY);
        self.set(to, code);
        true
    }

    /// [`Board::relocate`] for a piece the caller has just looked up. Nothing
    /// standing on its square means the grid and the piece list disagree.
    pub fn relocate_piece(&mut self, piece: &Piece, to: Position) -> Result<(), ChessError> {
        if self.relocate(piece.position, to) {
            Ok(())
        } else {
            Err(self.piece_not_found(piece))
        }
    }

    pub(crate) fn piece_not_found(&self, piece: &Piece) -> ChessError {
        let identity = self.canonical_identity();
        warn!("{} is not on board {identity}", piece.name());
        ChessError::PieceNotFound { piece: piece.name(), board: identity }
    }

    /// Re-establish the piece/grid invariant: every active piece's code must
    /// equal the code stored at its position. Pieces that disagree have been
    /// captured or replaced and are dropped.
    pub fn sync_pieces(&mut self) {
        let grid = self.grid;
        self.pieces
            .retain(|p| grid[p.position.row()][p.position.file()] == p.code());
    }

    /// True when every active piece agrees with the grid and every occupied
    /// cell has exactly one piece.
    pub fn is_consistent(&self) -> bool {
        let mut seen = [[false; 8]; 8];
        for p in &self.pieces {
            let (r, f) = (p.position.row(), p.position.file());
            if self.grid[r][f] != p.code() || seen[r][f] {
                return false;
            }
            seen[r][f] = true;
        }
        Position::all().all(|pos| {
            matches!(self.square(pos), Square::Empty | Square::Disabled) || seen[pos.row()][pos.file()]
        })
    }

    pub(crate) fn promotions_mut(&mut self) -> &mut PromotionTracker {
        &mut self.promotions
    }

    /// 64-character key of the grid, A8 first. Kings are 1/2, queens 3/4,
    /// rooks 5/6, bishops 7/8, knights 9/A, pawns B/C (white/black), empty
    /// squares 0 and disabled squares X.
    pub fn canonical_identity(&self) -> String {
        Position::all().map(|p| identity_char(self.square(p))).collect()
    }

    /// Rebuild a board from [`Board::canonical_identity`]. Instance ids are
    /// assigned in scan order per color and type; every piece starts where it
    /// stands. Kings off their home square and rooks off a home corner count
    /// as moved, so they never castle.
    pub fn from_identity(identity: &str) -> Result<Board, ChessError> {
        if identity.chars().count() != 64 {
            return Err(ChessError::InvalidIdentity(format!(
                "expected 64 squares, found {}",
                identity.chars().count()
            )));
        }
        let mut board = Board::empty();
        let mut ids = [[0u8; 7]; 2];
        for (position, c) in Position::all().zip(identity.chars()) {
            match square_from_identity_char(c) {
                Some(Square::Empty) => {}
                Some(Square::Disabled) => board.set(position, DISABLED),
                Some(Square::Occupied(color, pt)) => {
                    let counter = &mut ids[(color == Color::Black) as usize][pt.ordinal() as usize];
                    *counter += 1;
                    let mut piece = Piece::new(pt, color, *counter, position);
                    piece.has_moved = match pt {
                        PieceType::King => !is_king_home(color, position),
                        PieceType::Rook => !is_rook_home(color, position),
                        _ => false,
                    };
                    board.place(piece);
                }
                None => {
                    return Err(ChessError::InvalidIdentity(format!(
                        "unexpected character {c:?} at {position}"
                    )))
                }
            }
        }
        Ok(board)
    }

    /// Flags that affect future moves but are invisible in the grid: pawns
    /// still capturable en passant, kings that can no longer castle and rooks
    /// standing on a home corner after having moved.
    pub fn state_signature(&self) -> String {
        let mut flagged: Vec<(Position, char)> = self
            .pieces
            .iter()
            .filter_map(|p| {
                if p.moved_two_squares() {
                    Some((p.position, 'e'))
                } else if p.is_king() && (p.has_moved || p.was_in_check()) {
                    Some((p.position, 'k'))
                } else if p.piece_type() == PieceType::Rook && p.has_moved && is_rook_home(p.color, p.position) {
                    Some((p.position, 'r'))
                } else {
                    None
                }
            })
            .collect();
        flagged.sort();
        flagged.into_iter().map(|(pos, tag)| format!("{tag}{pos}")).collect()
    }
}

/// E1 for white, E8 for black.
pub fn is_king_home(color: Color, position: Position) -> bool {
    position.row() == color.home_row() && position.file() == 4
}

/// The two corners of a color's back rank.
pub fn is_rook_home(color: Color, position: Position) -> bool {
    position.row() == color.home_row() && matches!(position.file(), 0 | 7)
}

fn identity_char(square: Square) -> char {
    match square {
        Square::Empty => '0',
        Square::Disabled => 'X',
        Square::Occupied(color, pt) => {
            let white = color == Color::White;
            match pt {
                PieceType::King => if white { '1' } else { '2' },
                PieceType::Queen => if white { '3' } else { '4' },
                PieceType::Rook => if white { '5' } else { '6' },
                PieceType::Bishop => if white { '7' } else { '8' },
                PieceType::Knight => if white { '9' } else { 'A' },
                PieceType::Pawn => if white { 'B' } else { 'C' },
            }
        }
    }
}

fn square_from_identity_char(c: char) -> Option<Square> {
    let (color, pt) = match c {
        '0' => return Some(Square::Empty),
        'X' => return Some(Square::Disabled),
        '1' => (Color::White, PieceType::King),
        '2' => (Color::Black, PieceType::King),
        '3' => (Color::White, PieceType::Queen),
        '4' => (Color::Black, PieceType::Queen),
        '5' => (Color::White, PieceType::Rook),
        '6' => (Color::Black, PieceType::Rook),
        '7' => (Color::White, PieceType::Bishop),
        '8' => (Color::Black, PieceType::Bishop),
        '9' => (Color::White, PieceType::Knight),
        'A' => (Color::Black, PieceType::Knight),
        'B' => (Color::White, PieceType::Pawn),
        'C' => (Color::Black, PieceType::Pawn),
        _ => return None,
    };
    Some(Square::Occupied(color, pt))
}

/// Text grid built from the occupancy codes alone, rank 8 at the top.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HEADER: &str = "*|*A*|*B*|*C*|*D*|*E*|*F*|*G*|*H*|*";
        writeln!(f, "{HEADER}")?;
        for row in 0..8 {
            let rank = 8 - row;
            write!(f, "{rank}")?;
            for file in 0..8 {
                let cell = Position::at(row, file).map(|p| self.square(p)).unwrap_or(Square::Empty);
                match cell {
                    Square::Empty => write!(f, "|   ")?,
                    Square::Disabled => write!(f, "|XXX")?,
                    Square::Occupied(color, pt) => write!(f, "|{}{} ", color.letter(), pt.letter())?,
                }
            }
            writeln!(f, "|{rank}")?;
        }
        writeln!(f, "{HEADER}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    #[test]
    fn standard_layout() {
        let board = Board::standard();
        assert_eq!(board.active_pieces().len(), 32);
        assert_eq!(board.get(pos("E1")), 16, "white king");
        assert_eq!(board.get(pos("D8")), 25, "black queen");
        assert_eq!(board.get(pos("E4")), EMPTY);
        assert_eq!(board.find_piece(Color::White, PieceType::Pawn, 5).map(|p| p.position), Some(pos("E2")));
        assert_eq!(board.find_piece(Color::Black, PieceType::Knight, 2).map(|p| p.position), Some(pos("G8")));
        assert_eq!(board.find_piece(Color::White, PieceType::Rook, 1).map(|p| p.position), Some(pos("A1")));
        assert!(board.is_consistent());
    }

    #[test]
    fn occupancy_queries() {
        let mut board = Board::standard();
        assert!(board.is_occupied(pos("A2")));
        assert!(board.is_occupied_by(pos("A2"), Color::White));
        assert!(!board.is_occupied_by(pos("A2"), Color::Black));
        assert!(board.is_occupied_by_type(pos("G8"), Color::Black, PieceType::Knight));
        board.disable(pos("D5"));
        assert!(board.is_occupied(pos("D5")));
        assert!(board.is_disabled(pos("D5")));
        assert!(!board.is_occupied_by(pos("D5"), Color::White));
    }

    #[test]
    fn set_changes_only_the_target_cell() {
        let mut board = Board::standard();
        let before = board.canonical_identity();
        board.set(pos("E4"), 11);
        let after = board.canonical_identity();
        let changed: Vec<usize> = before
            .chars()
            .zip(after.chars())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(changed, vec![4 * 8 + 4]);
        assert_eq!(board.active_pieces().len(), 32, "pieces are not resynced by set");
    }

    #[test]
    fn sync_prunes_pieces_whose_code_disagrees() {
        let mut board = Board::standard();
        assert!(board.relocate(pos("D1"), pos("D7")));
        assert_eq!(board.active_pieces().len(), 32, "captured pawn still listed before sync");
        board.sync_pieces();
        assert_eq!(board.active_pieces().len(), 31);
        assert!(board.find_piece(Color::Black, PieceType::Pawn, 4).is_none());
        assert_eq!(board.piece_at(pos("D7")).map(|p| p.name()), Some("White Queen 1".to_string()));
        assert!(board.is_consistent());
    }

    #[test]
    fn identity_of_standard_board() {
        let expected = format!("6A8428A6{}{}{}59731795", "C".repeat(8), "0".repeat(32), "B".repeat(8));
        assert_eq!(Board::standard().canonical_identity(), expected);
    }

    #[test]
    fn clone_keeps_identity_and_is_independent() {
        let board = Board::standard();
        let mut clone = board.clone();
        assert_eq!(clone.canonical_identity(), board.canonical_identity());
        clone.relocate(pos("E2"), pos("E4"));
        assert_ne!(clone.canonical_identity(), board.canonical_identity());
        assert_eq!(board.piece_at(pos("E2")).map(|p| p.has_moved), Some(false));
    }

    #[test]
    fn from_identity_round_trips() {
        let mut board = Board::standard();
        board.disable(pos("C5"));
        let identity = board.canonical_identity();
        let rebuilt = Board::from_identity(&identity).unwrap();
        assert_eq!(rebuilt.canonical_identity(), identity);
        assert_eq!(rebuilt.active_pieces().len(), 32);
        assert!(rebuilt.is_disabled(pos("C5")));
        assert!(matches!(Board::from_identity("123"), Err(ChessError::InvalidIdentity(_))));
        assert!(matches!(Board::from_identity(&"Z".repeat(64)), Err(ChessError::InvalidIdentity(_))));
    }

    #[test]
    fn signature_tracks_flags_the_grid_cannot_show() {
        let mut board = Board::standard();
        assert_eq!(board.state_signature(), "");
        board.relocate(pos("H1"), pos("H3"));
        board.relocate(pos("H3"), pos("H1"));
        board.relocate(pos("E8"), pos("E7"));
        assert_eq!(board.canonical_identity().len(), 64);
        assert_eq!(board.state_signature(), "kE7rH1");
    }

    #[test]
    fn rebuilt_kings_and_rooks_off_home_count_as_moved() {
        let identity = format!("60002006{}00510000", "0".repeat(48));
        let board = Board::from_identity(&identity).unwrap();
        assert!(!board.piece_at(pos("A8")).unwrap().has_moved);
        assert!(!board.piece_at(pos("H8")).unwrap().has_moved);
        assert!(!board.piece_at(pos("E8")).unwrap().has_moved);
        assert!(board.piece_at(pos("C1")).unwrap().has_moved);
        assert!(board.piece_at(pos("D1")).unwrap().has_moved);
        assert_eq!(board.state_signature(), "kD1");
    }

    #[test]
    fn relocating_a_missing_piece_is_fatal() {
        let mut board = Board::standard();
        let knight = *board.piece_at(pos("G1")).unwrap();
        board.relocate_piece(&knight, pos("F3")).unwrap();
        let err = board.relocate_piece(&knight, pos("H3")).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, ChessError::PieceNotFound { .. }));
        assert!(board.is_occupied(pos("F3")));
        assert!(!board.is_occupied(pos("H3")));
    }

    #[test]
    fn promotion_ids_are_monotonic_per_color_and_type() {
        let mut tracker = PromotionTracker::default();
        assert_eq!(tracker.next_id(Color::White, PieceType::Queen), 2);
        assert_eq!(tracker.next_id(Color::White, PieceType::Queen), 3);
        assert_eq!(tracker.next_id(Color::Black, PieceType::Queen), 2);
        assert_eq!(tracker.next_id(Color::White, PieceType::Knight), 3);
    }

    #[test]
    fn rendering_uses_only_the_grid() {
        let mut board = Board::empty();
        board.place(Piece::king(Color::White, pos("E1")));
        board.set(pos("A8"), DISABLED);
        let text = board.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert!(lines[1].starts_with("8|XXX|"));
        assert!(lines[8].contains("|WK |"));
    }
}
