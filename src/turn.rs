// =============================================================================
// Turns
//
// A turn is the result of asking one piece to move on a board. The board is
// cloned first and the move is applied to the clone, so the board a turn was
// created from is never modified and sibling turns share no state.
//
// Turn numbers alternate sides: an odd turn is made by White, an even one by
// Black. A root turn stands for "no move yet" and carries the position the
// search starts from.
// =============================================================================

use log::trace;
use serde::Serialize;

use crate::board::{Board, EMPTY};
use crate::check;
use crate::command;
use crate::error::Result;
use crate::piece::{Color, Piece};
use crate::position::Position;
use crate::special::MoveContext;

/// Description carried by every rejected turn.
pub const INVALID_DESCRIPTION: &str = "Invalid Move";

#[derive(Clone, Debug)]
pub struct Turn {
    number: u32,
    side: Color,
    /// The mover as it stands after the move: a promoted pawn is still the
    /// pawn here. Unmoved when the turn is invalid.
    piece: Option<Piece>,
    from: Option<Position>,
    to: Option<Position>,
    board: Board,
    valid: bool,
    description: String,
}

impl Turn {
    /// Side that makes turn `number`.
    pub fn side_for(number: u32) -> Color {
        if number % 2 == 0 {
            Color::Black
        } else {
            Color::White
        }
    }

    /// Starting point of a game or search with `to_move` about to play.
    pub fn root(board: Board, to_move: Color) -> Turn {
        let number = match to_move {
            Color::White => 0,
            Color::Black => 1,
        };
        Turn {
            number,
            side: Turn::side_for(number),
            piece: None,
            from: None,
            to: None,
            board,
            valid: true,
            description: "Start".to_string(),
        }
    }

    /// Apply `piece` moving to `to` on a clone of `board`.
    ///
    /// Illegal moves are not errors; they produce a turn with
    /// [`Turn::is_valid`] false and [`INVALID_DESCRIPTION`]. Errors are
    /// reserved for broken board state: a piece that is not among the
    /// board's active pieces, or castling geometry the rules cannot handle.
    pub fn new(number: u32, board: &Board, piece: &Piece, to: Position, ctx: &MoveContext<'_>) -> Result<Turn> {
        let side = Turn::side_for(number);
        let mut next = board.clone();
        let Some(index) = next.index_of(piece) else {
            return Err(board.piece_not_found(piece));
        };
        let mover = next.active_pieces()[index];
        let from = mover.position;

        if !mover.is_valid_move(&next, to, ctx.special) {
            trace!("turn {number}: {} cannot reach {to}", mover.name());
            return Ok(Turn {
                number,
                side,
                piece: Some(mover),
                from: Some(from),
                to: Some(to),
                board: next,
                valid: false,
                description: INVALID_DESCRIPTION.to_string(),
            });
        }

        let castling = mover.is_king() && ctx.special.is_castle(&next, &mover, to);
        let en_passant = if mover.is_pawn() && !castling {
            ctx.special.mark_en_passant(&mut next, &mover, to)
        } else {
            None
        };
        let captured = next.piece_at(to).filter(|p| p.color != mover.color).map(|p| p.name());

        // A two-square advance can only be answered on the very next turn.
        for p in next.pieces_mut() {
            p.set_moved_two_squares(false);
        }

        let mut action = match captured {
            Some(name) => format!("capture [{name}]"),
            None => "move".to_string(),
        };
        let moved = if castling {
            action = ctx.special.castle(&mut next, &mover, to)?.label().to_string();
            next.king(mover.color).copied()
        } else {
            next.relocate_piece(&mover, to)?;
            if let Some(p) = next.piece_at_mut(to) {
                if p.is_pawn() && from.distance(to).0.abs() == 2 {
                    p.set_moved_two_squares(true);
                }
            }
            next.piece_at(to).copied()
        };

        if let Some(target) = en_passant {
            if let Some(victim) = next.piece_at(target).filter(|p| p.is_en_passant_target()) {
                action = format!("capture [{}]", victim.name());
            }
            next.set(target, EMPTY);
        }

        if let Some(pawn) = moved.filter(|p| p.is_pawn() && p.position.row() == p.color.promotion_row()) {
            let promoted = ctx.special.promote(&mut next, &pawn, ctx.promotion_choice());
            trace!("turn {number}: {} promoted to {}", pawn.name(), promoted.name());
        }

        next.sync_pieces();

        // A king that has been checked may never castle afterwards.
        let opponent = mover.color.opposite();
        if check::is_in_check(&next, opponent, ctx.special) {
            if let Some(king) = next.king_mut(opponent) {
                king.set_was_in_check();
            }
        }

        let description = format!("{} {from} {action} {to}", mover.name());
        trace!("turn {number}: {description}");
        Ok(Turn {
            number,
            side,
            piece: moved,
            from: Some(from),
            to: Some(to),
            board: next,
            valid: true,
            description,
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Side that made this turn.
    pub fn side(&self) -> Color {
        self.side
    }

    /// Side to play after this turn.
    pub fn to_move(&self) -> Color {
        self.side.opposite()
    }

    pub fn piece(&self) -> Option<&Piece> {
        self.piece.as_ref()
    }

    pub fn from(&self) -> Option<Position> {
        self.from
    }

    pub fn to(&self) -> Option<Position> {
        self.to
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn pieces(&self) -> &[Piece] {
        self.board.active_pieces()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_root(&self) -> bool {
        self.piece.is_none()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn identity(&self) -> String {
        self.board.canonical_identity()
    }

    /// The command that replays this turn from its parent, e.g. "WN2 F3".
    pub fn command(&self) -> Option<String> {
        Some(command::format_command(self.piece.as_ref()?, self.to?))
    }
}

/// One explored turn with its subtree, as reported by the explorer.
#[derive(Clone, Debug, Serialize)]
pub struct TurnNode {
    pub number: u32,
    pub side: Color,
    pub description: String,
    pub command: Option<String>,
    pub identity: String,
    /// The move leaves the opponent in check.
    pub gives_check: bool,
    /// Turns found below this one.
    pub count: u64,
    pub children: Vec<TurnNode>,
}

impl TurnNode {
    pub fn new(turn: &Turn, gives_check: bool) -> TurnNode {
        TurnNode {
            number: turn.number(),
            side: turn.side(),
            description: turn.description().to_string(),
            command: turn.command(),
            identity: turn.identity(),
            gives_check,
            count: 0,
            children: Vec::new(),
        }
    }
}
