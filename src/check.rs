//! Check, checkmate and stalemate.
//!
//! Detection is brute force: a king is in check when any opposing piece's
//! move predicate accepts the king's square. A board without a king of the
//! asked color is never in check.

use crate::board::Board;
use crate::error::Result;
use crate::explorer::legal_turns;
use crate::piece::{Color, Piece};
use crate::special::{MoveContext, SpecialMoves};
use crate::turn::Turn;

pub fn is_in_check(board: &Board, color: Color, special: &dyn SpecialMoves) -> bool {
    let Some(king) = board.king(color) else {
        return false;
    };
    board
        .pieces_of(color.opposite())
        .any(|p| p.is_valid_move(board, king.position, special))
}

/// Does `turn` leave the king of the side that made it in check? The king's
/// square is read from the turn's board, so a king that just moved is tested
/// on its new square.
pub fn is_king_in_check(turn: &Turn, special: &dyn SpecialMoves) -> bool {
    is_in_check(turn.board(), turn.side(), special)
}

/// The side to move after `turn` is in check and has no legal reply.
pub fn is_checkmate(turn: &Turn, ctx: &MoveContext<'_>) -> Result<bool> {
    if !is_in_check(turn.board(), turn.to_move(), ctx.special) {
        return Ok(false);
    }
    Ok(legal_turns(turn, ctx)?.is_empty())
}

/// The side to move after `turn` is not in check but has no legal reply.
pub fn is_stalemate(turn: &Turn, ctx: &MoveContext<'_>) -> Result<bool> {
    if is_in_check(turn.board(), turn.to_move(), ctx.special) {
        return Ok(false);
    }
    Ok(legal_turns(turn, ctx)?.is_empty())
}

/// Opposing pieces `piece` could capture right now, most valuable first.
pub fn attacked_pieces(board: &Board, piece: &Piece, special: &dyn SpecialMoves) -> Vec<Piece> {
    let mut targets: Vec<Piece> = board
        .pieces_of(piece.color.opposite())
        .filter(|p| piece.is_valid_move(board, p.position, special))
        .copied()
        .collect();
    targets.sort_by(|a, b| b.piece_type().cmp(&a.piece_type()).then(a.position.cmp(&b.position)));
    targets
}

/// Every piece that can capture something, with its [`attacked_pieces`].
pub fn all_attacks(board: &Board, special: &dyn SpecialMoves) -> Vec<(Piece, Vec<Piece>)> {
    board
        .active_pieces()
        .iter()
        .map(|attacker| (*attacker, attacked_pieces(board, attacker, special)))
        .filter(|(_, targets)| !targets.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceType;
    use crate::position::Position;
    use crate::special::StandardSpecialMoves;

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    fn play(turn: &Turn, from: &str, to: &str) -> Turn {
        let piece = *turn.board().piece_at(pos(from)).unwrap();
        Turn::new(turn.number() + 1, turn.board(), &piece, pos(to), &MoveContext::standard()).unwrap()
    }

    #[test]
    fn opening_position_is_quiet() {
        let root = Turn::root(Board::standard(), Color::White);
        let ctx = MoveContext::standard();
        assert!(!is_in_check(root.board(), Color::White, &StandardSpecialMoves));
        assert!(!is_checkmate(&root, &ctx).unwrap());
        assert!(!is_stalemate(&root, &ctx).unwrap());
    }

    #[test]
    fn fools_mate() {
        let root = Turn::root(Board::standard(), Color::White);
        let t = play(&root, "F2", "F3");
        let t = play(&t, "E7", "E5");
        let t = play(&t, "G2", "G4");
        let t = play(&t, "D8", "H4");
        assert!(is_in_check(t.board(), Color::White, &StandardSpecialMoves));
        assert!(is_checkmate(&t, &MoveContext::standard()).unwrap());
        assert!(!is_stalemate(&t, &MoveContext::standard()).unwrap());
    }

    #[test]
    fn moving_into_check_is_detected_on_the_new_square() {
        let mut board = Board::empty();
        board.place(Piece::king(Color::White, pos("E1")));
        board.place(Piece::rook(Color::Black, 1, pos("D8")));
        board.place(Piece::king(Color::Black, pos("H8")));
        let root = Turn::root(board, Color::White);
        let into = play(&root, "E1", "D1");
        assert!(is_king_in_check(&into, &StandardSpecialMoves));
        let away = play(&root, "E1", "F1");
        assert!(!is_king_in_check(&away, &StandardSpecialMoves));
    }

    #[test]
    fn cornered_king_without_check_is_stalemate() {
        let mut board = Board::empty();
        board.place(Piece::king(Color::Black, pos("H8")));
        board.place(Piece::queen(Color::White, 1, pos("G6")));
        board.place(Piece::king(Color::White, pos("A1")));
        let root = Turn::root(board, Color::Black);
        let ctx = MoveContext::standard();
        assert!(is_stalemate(&root, &ctx).unwrap());
        assert!(!is_checkmate(&root, &ctx).unwrap());
    }

    #[test]
    fn missing_king_is_never_in_check() {
        let mut board = Board::empty();
        board.place(Piece::queen(Color::Black, 1, pos("D8")));
        assert!(!is_in_check(&board, Color::White, &StandardSpecialMoves));
    }

    #[test]
    fn attacked_pieces_are_ordered_by_value() {
        let mut board = Board::empty();
        let knight = Piece::knight(Color::White, 1, pos("D4"));
        board.place(knight);
        board.place(Piece::pawn(Color::Black, 1, pos("C6")));
        board.place(Piece::rook(Color::Black, 1, pos("E6")));
        board.place(Piece::queen(Color::Black, 1, pos("F5")));
        board.place(Piece::queen(Color::White, 1, pos("B5")));
        let targets: Vec<PieceType> = attacked_pieces(&board, &knight, &StandardSpecialMoves)
            .iter()
            .map(|p| p.piece_type())
            .collect();
        assert_eq!(targets, vec![PieceType::Queen, PieceType::Rook, PieceType::Pawn]);
    }

    #[test]
    fn attack_map_covers_both_sides() {
        let mut board = Board::empty();
        board.place(Piece::knight(Color::White, 1, pos("D4")));
        board.place(Piece::pawn(Color::Black, 1, pos("C6")));
        board.place(Piece::rook(Color::Black, 1, pos("E6")));
        board.place(Piece::queen(Color::Black, 1, pos("F5")));
        board.place(Piece::queen(Color::White, 1, pos("B5")));

        let map = all_attacks(&board, &StandardSpecialMoves);
        let targets_of = |square: &str| -> Vec<String> {
            map.iter()
                .find(|(attacker, _)| attacker.position == pos(square))
                .map(|(_, targets)| targets.iter().map(|p| p.position.notation()).collect())
                .unwrap_or_default()
        };
        assert_eq!(map.len(), 4, "the rook on E6 attacks nothing");
        assert_eq!(targets_of("D4"), vec!["F5", "E6", "C6"]);
        assert_eq!(targets_of("B5"), vec!["F5", "C6"]);
        assert_eq!(targets_of("F5"), vec!["B5"]);
        assert_eq!(targets_of("C6"), vec!["B5"]);
        assert!(targets_of("E6").is_empty());
    }
}
