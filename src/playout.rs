//! Random games, used to seed searches from varied positions.

use log::debug;
use rand::Rng;

use crate::board::Board;
use crate::error::Result;
use crate::explorer::legal_turns;
use crate::piece::Color;
use crate::special::MoveContext;
use crate::turn::Turn;

/// Play up to `plies` uniformly random legal turns from `board`. Stops early
/// when the side to move has no legal turn. The same seed always yields the
/// same game.
pub fn random_playout<R: Rng>(board: Board, to_move: Color, plies: usize, rng: &mut R) -> Result<Vec<Turn>> {
    let ctx = MoveContext::standard().simulated();
    let mut current = Turn::root(board, to_move);
    let mut played = Vec::with_capacity(plies);
    for _ in 0..plies {
        let mut options = legal_turns(&current, &ctx)?;
        if options.is_empty() {
            debug!("playout ended after {} plies: no legal turn", played.len());
            break;
        }
        let pick = rng.gen_range(0..options.len());
        current = options.swap_remove(pick);
        played.push(current.clone());
    }
    Ok(played)
}

/// The turn reached after a random playout, or the root when nothing was played.
pub fn random_turn<R: Rng>(board: Board, to_move: Color, plies: usize, rng: &mut R) -> Result<Turn> {
    let root = Turn::root(board.clone(), to_move);
    Ok(random_playout(board, to_move, plies, rng)?.pop().unwrap_or(root))
}
