use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;

use chess_explorer::board::Board;
use chess_explorer::cache::TranspositionCache;
use chess_explorer::explorer::{CountMode, Explorer, ExplorerConfig};
use chess_explorer::piece::Color;
use chess_explorer::playout::random_turn;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Every turn at every depth up to the limit.
    Count,
    /// Only turns at exactly the depth limit.
    Leaf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    White,
    Black,
}

/// Count the turns reachable from a chess position.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Plies to explore.
    #[arg(short, long, default_value_t = 3)]
    depth: u32,

    /// Worker threads. Defaults to the available parallelism.
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(short, long, value_enum, default_value_t = Mode::Count)]
    mode: Mode,

    /// Start from this 64-character board identity instead of the standard layout.
    #[arg(long)]
    from: Option<String>,

    /// Side to move in the starting position.
    #[arg(long, value_enum, default_value_t = Side::White)]
    to_move: Side,

    /// Play this many random plies before exploring.
    #[arg(long, default_value_t = 0)]
    random_plies: usize,

    /// Seed for the random plies.
    #[arg(long)]
    seed: Option<u64>,

    /// Disable the transposition cache.
    #[arg(long)]
    no_cache: bool,

    /// Show the most accessed cache entries.
    #[arg(long, default_value_t = 0)]
    top: usize,

    #[arg(long)]
    load_cache: Option<PathBuf>,

    #[arg(long)]
    save_cache: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    println!("=== chess-explorer perft (built {}) ===", env!("BUILD_TIMESTAMP"));

    let board = match &args.from {
        Some(identity) => Board::from_identity(identity).context("parsing --from")?,
        None => Board::standard(),
    };
    let to_move = match args.to_move {
        Side::White => Color::White,
        Side::Black => Color::Black,
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let start = random_turn(board, to_move, args.random_plies, &mut rng)?;
    if !start.is_root() {
        println!("After {} random plies: {}", args.random_plies, start.description());
    }
    println!("{}", start.board());

    let mut config = ExplorerConfig::new();
    config.use_cache = !args.no_cache;
    if let Some(threads) = args.threads {
        config.threads = threads.max(1);
    }
    let mut explorer = Explorer::with_config(config);
    if let Some(path) = &args.load_cache {
        let cache = TranspositionCache::load_json(path)
            .with_context(|| format!("loading cache from {}", path.display()))?;
        println!("Loaded {} cache entries", cache.len());
        explorer = explorer.with_cache(cache);
    }

    let mode = match args.mode {
        Mode::Count => CountMode::Cumulative,
        Mode::Leaf => CountMode::Leaves,
    };
    let started = Instant::now();
    let total = explorer.run(&start, args.depth, mode)?;
    let elapsed = started.elapsed();
    println!("{mode:?} at depth {}: {total} ({:.2?})", args.depth, elapsed);

    let stats = explorer.cache().stats();
    if !args.no_cache {
        println!(
            "Cache: {} entries in {} partitions, {} lookups, {:.1}% hits ({} from main tier)",
            stats.entries,
            stats.partitions,
            stats.lookups,
            stats.hit_rate() * 100.0,
            stats.main_hits
        );
    }
    for entry in explorer.cache().top_n(args.top) {
        println!("  {:>8}  {:>10}  {}", entry.access_count, entry.value, entry.key);
    }

    if let Some(path) = &args.save_cache {
        explorer
            .cache()
            .save_json(path)
            .with_context(|| format!("saving cache to {}", path.display()))?;
    }
    Ok(())
}
