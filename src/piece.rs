use std::fmt;

use serde::{Deserialize, Serialize};

use crate::position::Position;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Added to the piece-type ordinal to form an occupancy code.
    pub fn code_offset(self) -> i8 {
        match self {
            Color::White => 10,
            Color::Black => 20,
        }
    }

    /// Row delta of a pawn advance. White climbs toward row 0 (rank 8).
    pub fn forward(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Row the king and rooks of this color start on.
    pub fn home_row(self) -> usize {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Row a pawn of this color starts on.
    pub fn pawn_row(self) -> usize {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// Row a pawn of this color promotes on.
    pub fn promotion_row(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Color::White => 'W',
            Color::Black => 'B',
        }
    }

    pub fn from_letter(c: char) -> Option<Color> {
        match c {
            'W' => Some(Color::White),
            'B' => Some(Color::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceType {
    Pawn = 1,
    Knight = 2,
    Bishop = 3,
    Rook = 4,
    Queen = 5,
    King = 6,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    pub fn ordinal(self) -> i8 {
        self as i8
    }

    pub fn from_ordinal(ordinal: i8) -> Option<PieceType> {
        PieceType::ALL.into_iter().find(|pt| pt.ordinal() == ordinal)
    }

    /// Board-rendering letter.
    pub fn letter(self) -> char {
        match self {
            PieceType::Pawn => 'P',
            PieceType::Knight => 'N',
            PieceType::Bishop => 'B',
            PieceType::Rook => 'R',
            PieceType::Queen => 'Q',
            PieceType::King => 'K',
        }
    }
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceType::Pawn => "Pawn",
            PieceType::Knight => "Knight",
            PieceType::Bishop => "Bishop",
            PieceType::Rook => "Rook",
            PieceType::Queen => "Queen",
            PieceType::King => "King",
        };
        f.write_str(name)
    }
}

/// Choice offered when a pawn reaches the far rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Promotion {
    #[default]
    Queen,
    Rook,
    Knight,
    Bishop,
}

impl Promotion {
    /// Accepts Q, R, N or B. K is taken as knight, matching the command syntax.
    pub fn from_letter(c: char) -> Option<Promotion> {
        match c.to_ascii_uppercase() {
            'Q' => Some(Promotion::Queen),
            'R' => Some(Promotion::Rook),
            'N' | 'K' => Some(Promotion::Knight),
            'B' => Some(Promotion::Bishop),
            _ => None,
        }
    }

    pub fn piece_type(self) -> PieceType {
        match self {
            Promotion::Queen => PieceType::Queen,
            Promotion::Rook => PieceType::Rook,
            Promotion::Knight => PieceType::Knight,
            Promotion::Bishop => PieceType::Bishop,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PawnState {
    /// Set by a two-square advance; cleared by the next turn on the board.
    pub moved_two_squares: bool,
    /// Set on the captured pawn while an en-passant capture is applied.
    pub en_passant_target: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KingState {
    pub was_in_check: bool,
}

/// Variant tag plus the state only that variant carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn(PawnState),
    Knight,
    Bishop,
    Rook,
    Queen,
    King(KingState),
}

impl PieceKind {
    pub fn piece_type(&self) -> PieceType {
        match self {
            PieceKind::Pawn(_) => PieceType::Pawn,
            PieceKind::Knight => PieceType::Knight,
            PieceKind::Bishop => PieceType::Bishop,
            PieceKind::Rook => PieceType::Rook,
            PieceKind::Queen => PieceType::Queen,
            PieceKind::King(_) => PieceType::King,
        }
    }

    pub fn from_type(piece_type: PieceType) -> PieceKind {
        match piece_type {
            PieceType::Pawn => PieceKind::Pawn(PawnState::default()),
            PieceType::Knight => PieceKind::Knight,
            PieceType::Bishop => PieceKind::Bishop,
            PieceType::Rook => PieceKind::Rook,
            PieceType::Queen => PieceKind::Queen,
            PieceType::King => PieceKind::King(KingState::default()),
        }
    }
}

/// One piece instance. Pieces are owned by the board they stand on and are
/// cloned along with it, so every search branch mutates its own copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
    /// Per color/type instance number. Kings are always 1.
    pub id: u8,
    pub start: Position,
    pub position: Position,
    pub has_moved: bool,
}

impl Piece {
    pub fn new(piece_type: PieceType, color: Color, id: u8, start: Position) -> Piece {
        let id = if piece_type == PieceType::King { 1 } else { id };
        Piece {
            kind: PieceKind::from_type(piece_type),
            color,
            id,
            start,
            position: start,
            has_moved: false,
        }
    }

    pub fn pawn(color: Color, id: u8, start: Position) -> Piece {
        Piece::new(PieceType::Pawn, color, id, start)
    }

    pub fn knight(color: Color, id: u8, start: Position) -> Piece {
        Piece::new(PieceType::Knight, color, id, start)
    }

    pub fn bishop(color: Color, id: u8, start: Position) -> Piece {
        Piece::new(PieceType::Bishop, color, id, start)
    }

    pub fn rook(color: Color, id: u8, start: Position) -> Piece {
        Piece::new(PieceType::Rook, color, id, start)
    }

    pub fn queen(color: Color, id: u8, start: Position) -> Piece {
        Piece::new(PieceType::Queen, color, id, start)
    }

    pub fn king(color: Color, start: Position) -> Piece {
        Piece::new(PieceType::King, color, 1, start)
    }

    pub fn piece_type(&self) -> PieceType {
        self.kind.piece_type()
    }

    /// Occupancy code this piece writes into the grid.
    pub fn code(&self) -> i8 {
        self.color.code_offset() + self.piece_type().ordinal()
    }

    /// e.g. "White Knight 2".
    pub fn name(&self) -> String {
        format!("{} {} {}", self.color, self.piece_type(), self.id)
    }

    pub fn is_king(&self) -> bool {
        matches!(self.kind, PieceKind::King(_))
    }

    pub fn is_pawn(&self) -> bool {
        matches!(self.kind, PieceKind::Pawn(_))
    }

    pub fn moved_two_squares(&self) -> bool {
        matches!(self.kind, PieceKind::Pawn(PawnState { moved_two_squares: true, .. }))
    }

    pub fn is_en_passant_target(&self) -> bool {
        matches!(self.kind, PieceKind::Pawn(PawnState { en_passant_target: true, .. }))
    }

    pub fn was_in_check(&self) -> bool {
        matches!(self.kind, PieceKind::King(KingState { was_in_check: true }))
    }

    pub(crate) fn set_moved_two_squares(&mut self, value: bool) {
        if let PieceKind::Pawn(state) = &mut self.kind {
            state.moved_two_squares = value;
        }
    }

    pub(crate) fn set_en_passant_target(&mut self) {
        if let PieceKind::Pawn(state) = &mut self.kind {
            state.en_passant_target = true;
        }
    }

    pub fn set_was_in_check(&mut self) {
        if let PieceKind::King(state) = &mut self.kind {
            state.was_in_check = true;
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.color, self.piece_type(), self.id)
    }
}
