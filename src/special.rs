// =============================================================================
// Special moves: castling, en passant and promotion
//
// These rules need to look at (or move) more than one piece, so pieces do not
// hard-code them. Every legality check and every turn receives a
// `SpecialMoves` resolver through a `MoveContext`; a rule-set variant swaps in
// its own resolver without touching the pieces.
// =============================================================================

use std::fmt;

use log::warn;

use crate::board::{is_rook_home, Board, EMPTY};
use crate::error::{ChessError, Result};
use crate::piece::{Color, Piece, PieceKind, PieceType, Promotion};
use crate::position::Position;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastleSide {
    King,
    Queen,
}

impl CastleSide {
    pub fn label(self) -> &'static str {
        match self {
            CastleSide::King => "Castle (King Side)",
            CastleSide::Queen => "Castle (Queen Side)",
        }
    }
}

impl fmt::Display for CastleSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub trait SpecialMoves: Send + Sync {
    /// Would moving `king` onto `to` be a castle?
    fn is_castle(&self, board: &Board, king: &Piece, to: Position) -> bool;

    /// Move king and rook for a castle already accepted by [`is_castle`].
    /// A king/rook file distance other than +4 or -3 means the board is
    /// corrupt and fails with [`ChessError::CastleGeometry`].
    ///
    /// [`is_castle`]: SpecialMoves::is_castle
    fn castle(&self, board: &mut Board, king: &Piece, rook_square: Position) -> Result<CastleSide>;

    /// Square of the pawn that `pawn` would capture en passant by moving to
    /// `to`, if that move is an en-passant capture.
    fn en_passant_target(&self, board: &Board, pawn: &Piece, to: Position) -> Option<Position>;

    /// Replace the pawn standing on the far rank with the chosen piece.
    fn promote(&self, board: &mut Board, pawn: &Piece, choice: Promotion) -> Piece;

    fn is_en_passant(&self, board: &Board, pawn: &Piece, to: Position) -> bool {
        self.en_passant_target(board, pawn, to).is_some()
    }

    /// Like [`SpecialMoves::en_passant_target`], and also flags the captured
    /// pawn so the turn being applied can take it off the board.
    fn mark_en_passant(&self, board: &mut Board, pawn: &Piece, to: Position) -> Option<Position> {
        let target = self.en_passant_target(board, pawn, to)?;
        if let Some(captured) = board.piece_at_mut(target) {
            captured.set_en_passant_target();
        }
        Some(target)
    }
}

/// Classic rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardSpecialMoves;

impl SpecialMoves for StandardSpecialMoves {
    fn is_castle(&self, board: &Board, king: &Piece, to: Position) -> bool {
        let PieceKind::King(state) = king.kind else {
            return false;
        };
        if king.has_moved || state.was_in_check || king.position != king.start {
            return false;
        }
        if !king.position.is_same_rank(to) || !is_rook_home(king.color, to) {
            return false;
        }
        // The rook must still stand on its own starting square.
        match board.piece_at(to) {
            Some(rook) if rook.color == king.color && rook.piece_type() == PieceType::Rook && !rook.has_moved => {}
            _ => return false,
        }
        let between = king.position.between(to);
        if between.iter().any(|&sq| board.is_occupied(sq)) {
            return false;
        }
        // Neither the king's square nor the path may be under attack.
        let opponent = king.color.opposite();
        !std::iter::once(king.position)
            .chain(between)
            .any(|sq| board.pieces_of(opponent).any(|p| p.attacks(board, sq)))
    }

    fn castle(&self, board: &mut Board, king: &Piece, rook_square: Position) -> Result<CastleSide> {
        let distance = king.position.file() as i8 - rook_square.file() as i8;
        let (side, king_shift, rook_shift) = match distance {
            4 => (CastleSide::Queen, -2, 3),
            -3 => (CastleSide::King, 2, -2),
            _ => return Err(castle_geometry(board, distance)),
        };
        let (Some(king_to), Some(rook_to)) = (
            king.position.offset(0, king_shift),
            rook_square.offset(0, rook_shift),
        ) else {
            return Err(castle_geometry(board, distance));
        };

        let Some(rook) = board.piece_at(rook_square).copied() else {
            return Err(castle_geometry(board, distance));
        };
        board.relocate_piece(king, king_to)?;
        board.relocate_piece(&rook, rook_to)?;
        Ok(side)
    }

    fn en_passant_target(&self, board: &Board, pawn: &Piece, to: Position) -> Option<Position> {
        if !pawn.is_pawn() {
            return None;
        }
        // One rank short of where an opposing two-square advance lands next to us.
        let capture_row = match pawn.color {
            Color::White => 3,
            Color::Black => 4,
        };
        if pawn.position.row() != capture_row || board.get(to) != EMPTY {
            return None;
        }

        [pawn.position.left(), pawn.position.right()]
            .into_iter()
            .flatten()
            .find(|&side| {
                let Some(target) = board.piece_at(side) else {
                    return false;
                };
                target.color != pawn.color
                    && target.moved_two_squares()
                    && side.offset(pawn.color.forward(), 0) == Some(to)
            })
    }

    fn promote(&self, board: &mut Board, pawn: &Piece, choice: Promotion) -> Piece {
        let piece_type = choice.piece_type();
        let id = board.promotions_mut().next_id(pawn.color, piece_type);
        let mut promoted = Piece::new(piece_type, pawn.color, id, pawn.position);
        promoted.has_moved = true;
        board.place(promoted);
        promoted
    }
}

fn castle_geometry(board: &Board, distance: i8) -> ChessError {
    let identity = board.canonical_identity();
    warn!("castle with king/rook file distance {distance} on board {identity}");
    ChessError::CastleGeometry { distance, board: identity }
}

pub type PromotionPrompt<'a> = &'a (dyn Fn() -> Promotion + Sync);

/// Per-call move configuration: the resolver, an optional promotion prompt
/// and whether the move is part of a simulated search. In simulation the
/// prompt is bypassed and pawns always promote to a queen.
#[derive(Clone, Copy)]
pub struct MoveContext<'a> {
    pub special: &'a dyn SpecialMoves,
    pub prompt: Option<PromotionPrompt<'a>>,
    pub simulation: bool,
}

impl MoveContext<'static> {
    pub fn standard() -> Self {
        MoveContext::new(&StandardSpecialMoves)
    }
}

impl<'a> MoveContext<'a> {
    pub fn new(special: &'a dyn SpecialMoves) -> Self {
        MoveContext { special, prompt: None, simulation: false }
    }

    pub fn with_prompt(self, prompt: PromotionPrompt<'a>) -> Self {
        MoveContext { prompt: Some(prompt), ..self }
    }

    pub fn simulated(self) -> Self {
        MoveContext { simulation: true, ..self }
    }

    pub fn promotion_choice(&self) -> Promotion {
        match self.prompt {
            Some(prompt) if !self.simulation => prompt(),
            _ => Promotion::Queen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    fn castling_board() -> Board {
        let mut board = Board::empty();
        board.place(Piece::king(Color::White, pos("E1")));
        board.place(Piece::rook(Color::White, 1, pos("A1")));
        board.place(Piece::rook(Color::White, 2, pos("H1")));
        board.place(Piece::king(Color::Black, pos("E8")));
        board
    }

    #[test]
    fn castle_requires_untouched_king_and_rook() {
        let board = castling_board();
        let king = *board.king(Color::White).unwrap();
        assert!(StandardSpecialMoves.is_castle(&board, &king, pos("A1")));
        assert!(StandardSpecialMoves.is_castle(&board, &king, pos("H1")));
        assert!(!StandardSpecialMoves.is_castle(&board, &king, pos("E2")));

        let mut moved = king;
        moved.has_moved = true;
        assert!(!StandardSpecialMoves.is_castle(&board, &moved, pos("H1")));

        let mut checked = king;
        checked.set_was_in_check();
        assert!(!StandardSpecialMoves.is_castle(&board, &checked, pos("A1")));
    }

    #[test]
    fn castle_only_onto_a_home_corner() {
        let mut board = Board::empty();
        board.place(Piece::king(Color::White, pos("E1")));
        board.place(Piece::rook(Color::White, 1, pos("F1")));
        board.place(Piece::rook(Color::White, 2, pos("B1")));
        let king = *board.king(Color::White).unwrap();
        assert!(!StandardSpecialMoves.is_castle(&board, &king, pos("F1")));
        assert!(!StandardSpecialMoves.is_castle(&board, &king, pos("B1")));
        assert!(!king.is_valid_move(&board, pos("F1"), &StandardSpecialMoves));

        let mut board = Board::empty();
        board.place(Piece::king(Color::Black, pos("E8")));
        board.place(Piece::rook(Color::Black, 2, pos("H8")));
        let king = *board.king(Color::Black).unwrap();
        assert!(StandardSpecialMoves.is_castle(&board, &king, pos("H8")));
    }

    #[test]
    fn castle_blocked_by_piece_or_attacked_path() {
        let mut board = castling_board();
        board.place(Piece::knight(Color::White, 1, pos("B1")));
        let king = *board.king(Color::White).unwrap();
        assert!(!StandardSpecialMoves.is_castle(&board, &king, pos("A1")));
        assert!(StandardSpecialMoves.is_castle(&board, &king, pos("H1")));

        board.place(Piece::rook(Color::Black, 1, pos("F8")));
        assert!(!StandardSpecialMoves.is_castle(&board, &king, pos("H1")), "F1 is attacked");
    }

    #[test]
    fn castle_moves_both_pieces() {
        let mut board = castling_board();
        let king = *board.king(Color::White).unwrap();
        let side = StandardSpecialMoves.castle(&mut board, &king, pos("H1")).unwrap();
        assert_eq!(side, CastleSide::King);
        assert_eq!(board.piece_at(pos("G1")).map(|p| p.is_king()), Some(true));
        assert_eq!(board.piece_at(pos("F1")).map(|p| p.piece_type()), Some(PieceType::Rook));
        assert!(!board.is_occupied(pos("E1")));
        assert!(!board.is_occupied(pos("H1")));

        let mut board = castling_board();
        let side = StandardSpecialMoves.castle(&mut board, &king, pos("A1")).unwrap();
        assert_eq!(side.label(), "Castle (Queen Side)");
        assert_eq!(board.piece_at(pos("C1")).map(|p| p.is_king()), Some(true));
        assert_eq!(board.piece_at(pos("D1")).map(|p| p.piece_type()), Some(PieceType::Rook));
    }

    #[test]
    fn castle_with_unknown_distance_is_fatal() {
        // An untouched king that starts on D1 next to a corner rook.
        let mut board = Board::empty();
        board.place(Piece::king(Color::White, pos("D1")));
        board.place(Piece::rook(Color::White, 1, pos("A1")));
        let king = *board.king(Color::White).unwrap();
        assert!(StandardSpecialMoves.is_castle(&board, &king, pos("A1")));

        let err = StandardSpecialMoves.castle(&mut board, &king, pos("A1")).unwrap_err();
        assert!(err.is_fatal());
        match err {
            ChessError::CastleGeometry { distance, board: identity } => {
                assert_eq!(distance, 3);
                assert_eq!(identity, board.canonical_identity());
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn en_passant_needs_a_fresh_two_square_advance() {
        let mut board = Board::empty();
        let white = Piece::pawn(Color::White, 5, pos("E2"));
        let mut white = white;
        white.position = pos("E5");
        board.place(white);
        let mut black = Piece::pawn(Color::Black, 4, pos("D7"));
        black.position = pos("D5");
        board.place(black);

        assert_eq!(StandardSpecialMoves.en_passant_target(&board, &white, pos("D6")), None);

        board.piece_at_mut(pos("D5")).unwrap().set_moved_two_squares(true);
        assert_eq!(StandardSpecialMoves.en_passant_target(&board, &white, pos("D6")), Some(pos("D5")));
        assert_eq!(StandardSpecialMoves.en_passant_target(&board, &white, pos("F6")), None);

        let target = StandardSpecialMoves.mark_en_passant(&mut board, &white, pos("D6"));
        assert_eq!(target, Some(pos("D5")));
        assert!(board.piece_at(pos("D5")).unwrap().is_en_passant_target());
    }

    #[test]
    fn promotion_replaces_the_pawn() {
        let mut board = Board::empty();
        let mut pawn = Piece::pawn(Color::White, 1, pos("A2"));
        pawn.position = pos("A8");
        board.place(pawn);

        let queen = StandardSpecialMoves.promote(&mut board, &pawn, Promotion::Queen);
        assert_eq!(queen.id, 2);
        let knight = StandardSpecialMoves.promote(&mut board, &pawn, Promotion::Knight);
        assert_eq!(knight.id, 3);
        assert_eq!(board.active_pieces().len(), 1);
        assert_eq!(board.piece_at(pos("A8")).map(|p| p.name()), Some("White Knight 3".to_string()));
    }

    #[test]
    fn simulation_bypasses_the_prompt() {
        let prompt = || Promotion::Rook;
        let ctx = MoveContext::standard().with_prompt(&prompt);
        assert_eq!(ctx.promotion_choice(), Promotion::Rook);
        assert_eq!(ctx.simulated().promotion_choice(), Promotion::Queen);
        assert_eq!(MoveContext::standard().promotion_choice(), Promotion::Queen);
    }
}
