// =============================================================================
// State-space explorer
//
// Walks every turn reachable from a starting turn to a fixed depth. Children
// of a turn are generated by asking each piece of the side to move for its
// reachable squares, building a turn for each, and keeping the valid ones
// that do not leave the mover's own king in check. A turn with no children
// (checkmate or stalemate) ends its branch and contributes nothing below it.
//
// Two counting modes share one recursion:
//   - Cumulative: every turn at every depth up to the limit is counted.
//     From the standard layout: 20, 420, 9322.
//   - Leaves: only turns at exactly the depth limit (classic perft).
//     From the standard layout: 20, 400, 8902, 197281.
//
// Subtree totals are memoized in a `TranspositionCache`. The key covers the
// position, the side to move, the hidden piece flags, the remaining depth and
// the mode, so two move orders reaching the same state share one entry.
// =============================================================================

use std::thread;
use std::time::Instant;

use log::{debug, info, warn};

use crate::board::Board;
use crate::cache::{TranspositionCache, DEFAULT_PARTITION_LEN};
use crate::check;
use crate::error::Result;
use crate::piece::Color;
use crate::special::{MoveContext, SpecialMoves, StandardSpecialMoves};
use crate::turn::{Turn, TurnNode};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Clone, Debug)]
pub struct ExplorerConfig {
    /// Drop turns that leave the mover's king in check. Turning this off
    /// counts pseudo-legal turns.
    pub filter_self_check: bool,
    /// Memoize subtree totals.
    pub use_cache: bool,
    /// Workers used by the parallel entry points.
    pub threads: usize,
    /// Key prefix length for the cache's index tier.
    pub partition_len: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplorerConfig {
    pub fn new() -> Self {
        ExplorerConfig {
            filter_self_check: true,
            use_cache: true,
            threads: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            partition_len: DEFAULT_PARTITION_LEN,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CountMode {
    Cumulative,
    Leaves,
}

impl CountMode {
    fn tag(self) -> char {
        match self {
            CountMode::Cumulative => 'c',
            CountMode::Leaves => 'l',
        }
    }

    /// Value of a branch with no depth left.
    fn base(self) -> u64 {
        match self {
            CountMode::Cumulative => 0,
            CountMode::Leaves => 1,
        }
    }

    /// What each child adds on its own, before its subtree.
    fn per_child(self) -> u64 {
        match self {
            CountMode::Cumulative => 1,
            CountMode::Leaves => 0,
        }
    }
}

// =============================================================================
// Turn generation
// =============================================================================

/// Every turn the side to move after `turn` can make, optionally dropping the
/// ones that leave its own king in check.
pub fn candidate_turns(turn: &Turn, ctx: &MoveContext<'_>, filter_self_check: bool) -> Result<Vec<Turn>> {
    let board = turn.board();
    let mover = turn.to_move();
    let number = turn.number() + 1;
    let mut turns = Vec::new();
    for piece in board.pieces_of(mover) {
        for to in piece.reachable_squares(board, ctx.special) {
            let next = Turn::new(number, board, piece, to, ctx)?;
            if !next.is_valid() {
                continue;
            }
            if filter_self_check && check::is_king_in_check(&next, ctx.special) {
                continue;
            }
            turns.push(next);
        }
    }
    Ok(turns)
}

/// Legal replies to `turn`.
pub fn legal_turns(turn: &Turn, ctx: &MoveContext<'_>) -> Result<Vec<Turn>> {
    candidate_turns(turn, ctx, true)
}

// =============================================================================
// Explorer
// =============================================================================

pub struct Explorer {
    config: ExplorerConfig,
    cache: TranspositionCache,
    special: Box<dyn SpecialMoves>,
}

impl Default for Explorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Explorer {
    pub fn new() -> Self {
        Explorer::with_config(ExplorerConfig::new())
    }

    pub fn with_config(config: ExplorerConfig) -> Self {
        let cache = TranspositionCache::new(config.partition_len);
        Explorer { config, cache, special: Box::new(StandardSpecialMoves) }
    }

    pub fn with_special(mut self, special: Box<dyn SpecialMoves>) -> Self {
        self.special = special;
        self
    }

    /// Start from a previously filled cache, e.g. one loaded from disk.
    pub fn with_cache(mut self, cache: TranspositionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn cache(&self) -> &TranspositionCache {
        &self.cache
    }

    /// Searches never prompt: promotions are always to a queen.
    pub fn context(&self) -> MoveContext<'_> {
        MoveContext::new(self.special.as_ref()).simulated()
    }

    pub fn root(&self, board: Board, to_move: Color) -> Turn {
        Turn::root(board, to_move)
    }

    /// Replies to `turn` the search would descend into.
    pub fn children(&self, turn: &Turn) -> Result<Vec<Turn>> {
        candidate_turns(turn, &self.context(), self.config.filter_self_check)
    }

    pub fn legal_turns(&self, turn: &Turn) -> Result<Vec<Turn>> {
        legal_turns(turn, &self.context())
    }

    pub fn cache_key(&self, turn: &Turn, depth: u32, mode: CountMode) -> String {
        format!(
            "{}{}{}:{}{}",
            turn.identity(),
            turn.to_move().letter(),
            turn.board().state_signature(),
            depth,
            mode.tag()
        )
    }

    /// Every turn reachable within `depth` plies, parents before children.
    pub fn possible_turns(&self, turn: &Turn, depth: u32) -> Result<Vec<Turn>> {
        let mut turns = Vec::new();
        if depth == 0 {
            return Ok(turns);
        }
        for child in self.children(turn)? {
            let below = self.possible_turns(&child, depth - 1)?;
            turns.push(child);
            turns.extend(below);
        }
        Ok(turns)
    }

    /// The explored tree below `turn` plus the cumulative turn count. Subtrees
    /// served from the cache carry their count but no children.
    pub fn turn_tree(&self, turn: &Turn, depth: u32) -> Result<(Vec<TurnNode>, u64)> {
        if depth == 0 {
            return Ok((Vec::new(), 0));
        }
        let special = self.special.as_ref();
        let mut nodes = Vec::new();
        let mut total = 0;
        for child in self.children(turn)? {
            let gives_check = check::is_in_check(child.board(), child.to_move(), special);
            let mut node = TurnNode::new(&child, gives_check);
            let key = self.cache_key(&child, depth - 1, CountMode::Cumulative);
            let cached = if self.config.use_cache && depth > 1 { self.cache.get(&key) } else { None };
            match cached {
                Some(count) => node.count = count,
                None => {
                    let (children, count) = self.turn_tree(&child, depth - 1)?;
                    if self.config.use_cache && depth > 1 {
                        self.cache.insert(&key, count);
                    }
                    node.children = children;
                    node.count = count;
                }
            }
            total += 1 + node.count;
            nodes.push(node);
        }
        Ok((nodes, total))
    }

    /// Turns reachable within `depth` plies, every depth counted.
    pub fn count(&self, turn: &Turn, depth: u32) -> Result<u64> {
        self.explore(turn, depth, CountMode::Cumulative)
    }

    /// Turns at exactly `depth` plies. `perft(turn, 0)` is 1.
    pub fn perft(&self, turn: &Turn, depth: u32) -> Result<u64> {
        self.explore(turn, depth, CountMode::Leaves)
    }

    pub fn count_parallel(&self, turn: &Turn, depth: u32) -> Result<u64> {
        self.explore_parallel(turn, depth, CountMode::Cumulative)
    }

    pub fn perft_parallel(&self, turn: &Turn, depth: u32) -> Result<u64> {
        self.explore_parallel(turn, depth, CountMode::Leaves)
    }

    pub fn run(&self, turn: &Turn, depth: u32, mode: CountMode) -> Result<u64> {
        let started = Instant::now();
        let total = if self.config.threads > 1 {
            self.explore_parallel(turn, depth, mode)?
        } else {
            self.explore(turn, depth, mode)?
        };
        info!("{mode:?} depth {depth}: {total} turns in {:.2?}", started.elapsed());
        debug!("cache after search: {:?}", self.cache.stats());
        Ok(total)
    }

    fn explore(&self, turn: &Turn, depth: u32, mode: CountMode) -> Result<u64> {
        if depth == 0 {
            return Ok(mode.base());
        }
        let key = self.config.use_cache.then(|| self.cache_key(turn, depth, mode));
        if let Some(total) = key.as_deref().and_then(|k| self.cache.get(k)) {
            return Ok(total);
        }

        let mut total = 0;
        for child in self.children(turn)? {
            total += mode.per_child() + self.explore(&child, depth - 1, mode)?;
        }

        Ok(match key {
            Some(k) => self.cache.insert(&k, total),
            None => total,
        })
    }

    /// Split the replies to `turn` across worker threads. Each worker sums
    /// its own subtrees and the partial sums are added once all have joined.
    /// A worker that panics contributes nothing; an error from any worker is
    /// returned after the others finish.
    fn explore_parallel(&self, turn: &Turn, depth: u32, mode: CountMode) -> Result<u64> {
        if depth == 0 {
            return Ok(mode.base());
        }
        let children = self.children(turn)?;
        if children.is_empty() {
            return Ok(0);
        }
        let workers = self.config.threads.clamp(1, children.len());
        let batch = children.len().div_ceil(workers);
        debug!("splitting {} replies over {workers} workers", children.len());

        let partials: Vec<Result<u64>> = thread::scope(|scope| {
            let handles: Vec<_> = children
                .chunks(batch)
                .enumerate()
                .map(|(worker, turns)| {
                    scope.spawn(move || -> Result<u64> {
                        let mut local = 0;
                        for child in turns {
                            local += mode.per_child() + self.explore(child, depth - 1, mode)?;
                        }
                        debug!("worker {worker} finished {} replies: {local}", turns.len());
                        Ok(local)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        warn!("explorer worker panicked; its subtrees are not counted");
                        Ok(0)
                    })
                })
                .collect()
        });

        let total = partials.into_iter().sum::<Result<u64>>()?;
        if self.config.use_cache {
            self.cache.insert(&self.cache_key(turn, depth, mode), total);
        }
        Ok(total)
    }
}
