// =============================================================================
// Move legality
//
// Each piece answers "may I move from where I stand to `to` on this board?".
// The predicates are pure: they read the board and never change it. Whether a
// move leaves the mover's own king in check is a separate question answered
// by `check`, after the move has been applied to a cloned board.
//
// A destination holding a friendly piece or a disabled square is always
// refused before any geometry is considered. The king's castling test is the
// one exception: it runs first, because its destination is a friendly rook.
// =============================================================================

use crate::board::Board;
use crate::piece::{Piece, PieceKind};
use crate::position::{Direction, Position};
use crate::special::SpecialMoves;

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];

impl Piece {
    pub fn is_valid_move(&self, board: &Board, to: Position, special: &dyn SpecialMoves) -> bool {
        if to == self.position {
            return false;
        }
        match self.kind {
            PieceKind::King(_) => {
                if special.is_castle(board, self, to) {
                    return true;
                }
                !is_blocked(board, self, to) && self.position.chebyshev(to) == 1
            }
            PieceKind::Pawn(_) => !is_blocked(board, self, to) && self.is_valid_pawn_move(board, to, special),
            PieceKind::Knight => !is_blocked(board, self, to) && is_knight_jump(self.position, to),
            PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
                !is_blocked(board, self, to) && self.slides_to(to) && is_path_clear(board, self.position, to)
            }
        }
    }

    fn is_valid_pawn_move(&self, board: &Board, to: Position, special: &dyn SpecialMoves) -> bool {
        if special.is_en_passant(board, self, to) {
            return true;
        }
        let forward = self.color.forward();
        let (dr, df) = self.position.distance(to);
        match (dr, df) {
            (r, 0) if r == forward => !board.is_occupied(to),
            (r, 0) if r == 2 * forward && self.position.row() == self.color.pawn_row() => {
                let hop = self.position.offset(forward, 0);
                hop.is_some_and(|h| !board.is_occupied(h)) && !board.is_occupied(to)
            }
            (r, 1 | -1) if r == forward => board.is_occupied_by(to, self.color.opposite()),
            _ => false,
        }
    }

    /// Line geometry for the sliding pieces, ignoring what stands in the way.
    fn slides_to(&self, to: Position) -> bool {
        let straight = self.position.is_same_rank(to) || self.position.is_same_file(to);
        let diagonal = self.position.is_diagonal(to);
        match self.kind {
            PieceKind::Rook => straight,
            PieceKind::Bishop => diagonal,
            PieceKind::Queen => straight || diagonal,
            _ => false,
        }
    }

    /// Would this piece capture on `target` if an enemy stood there? Unlike
    /// [`Piece::is_valid_move`] the target's occupancy is ignored and no
    /// special move counts, which makes it usable for squares a king only
    /// passes through.
    pub fn attacks(&self, board: &Board, target: Position) -> bool {
        if target == self.position {
            return false;
        }
        match self.kind {
            PieceKind::Pawn(_) => {
                let (dr, df) = self.position.distance(target);
                dr == self.color.forward() && df.abs() == 1
            }
            PieceKind::Knight => is_knight_jump(self.position, target),
            PieceKind::King(_) => self.position.chebyshev(target) == 1,
            PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
                self.slides_to(target) && is_path_clear(board, self.position, target)
            }
        }
    }

    /// Every destination accepted by [`Piece::is_valid_move`]. Candidates are
    /// generated per piece kind and then run through the predicate, so the
    /// result is the same as testing all 64 squares.
    pub fn reachable_squares(&self, board: &Board, special: &dyn SpecialMoves) -> Vec<Position> {
        let from = self.position;
        let mut candidates: Vec<Position> = Vec::new();
        match self.kind {
            PieceKind::Pawn(_) => {
                let forward = self.color.forward();
                for (dr, df) in [(forward, 0), (2 * forward, 0), (forward, -1), (forward, 1)] {
                    candidates.extend(from.offset(dr, df));
                }
            }
            PieceKind::Knight => {
                for (dr, df) in KNIGHT_OFFSETS {
                    candidates.extend(from.offset(dr, df));
                }
            }
            PieceKind::King(_) => {
                candidates.extend(Direction::ALL.iter().filter_map(|&d| from.neighbor(d)));
                // Castling destinations are the rooks themselves.
                candidates.extend(
                    board
                        .pieces_of(self.color)
                        .filter(|p| p.position.is_same_rank(from) && p.position.chebyshev(from) > 1)
                        .map(|p| p.position),
                );
            }
            PieceKind::Bishop => slide(board, from, &Direction::DIAGONAL, &mut candidates),
            PieceKind::Rook => slide(board, from, &Direction::STRAIGHT, &mut candidates),
            PieceKind::Queen => slide(board, from, &Direction::ALL, &mut candidates),
        }
        candidates.retain(|&to| self.is_valid_move(board, to, special));
        candidates
    }
}

/// Friendly piece or disabled square on the destination.
fn is_blocked(board: &Board, piece: &Piece, to: Position) -> bool {
    board.is_disabled(to) || board.is_occupied_by(to, piece.color)
}

fn is_knight_jump(from: Position, to: Position) -> bool {
    let (dr, df) = from.distance(to);
    matches!((dr.abs(), df.abs()), (1, 2) | (2, 1))
}

/// Every square strictly between `from` and `to` is empty.
pub(crate) fn is_path_clear(board: &Board, from: Position, to: Position) -> bool {
    from.between(to).into_iter().all(|sq| !board.is_occupied(sq))
}

/// Walk each ray until the first occupied square, which is included.
fn slide(board: &Board, from: Position, directions: &[Direction], out: &mut Vec<Position>) {
    for &direction in directions {
        let mut current = from;
        while let Some(next) = current.neighbor(direction) {
            out.push(next);
            if board.is_occupied(next) {
                break;
            }
            current = next;
        }
    }
}
