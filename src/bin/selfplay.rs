use anyhow::Result;
use rand::seq::SliceRandom;

use chess_explorer::game::Game;

const MAX_PLIES: usize = 200;

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = rand::thread_rng();
    let mut game = Game::new();

    while game.history().len() < MAX_PLIES {
        let mut options = game.legal_turns()?;
        options.shuffle(&mut rng);
        let Some(turn) = options.pop() else {
            break;
        };
        println!("{:>3}. {}", turn.number(), turn.description());
        game.push(turn);
    }

    println!("{}", game.board());
    let result = if game.is_checkmate()? {
        format!("{} is checkmated", game.to_move())
    } else if game.is_stalemate()? {
        "stalemate".to_string()
    } else {
        "ongoing".to_string()
    };
    eprintln!("Game over after {} plies: {result}", game.history().len());
    Ok(())
}
