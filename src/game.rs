// =============================================================================
// Game controller
//
// Drives one game from text commands: parses a command, checks that it names
// a piece of the side to move, builds the turn and accepts it only when it is
// valid and does not leave the mover's king in check. Accepted turns are
// appended to the history; rejected ones leave the game unchanged.
// =============================================================================

use log::debug;

use crate::board::Board;
use crate::check;
use crate::command;
use crate::error::Result;
use crate::explorer::legal_turns;
use crate::piece::{Color, Promotion};
use crate::special::{MoveContext, SpecialMoves, StandardSpecialMoves};
use crate::turn::Turn;

type Prompt = Box<dyn Fn() -> Promotion + Send + Sync>;

pub struct Game {
    start: Turn,
    history: Vec<Turn>,
    special: Box<dyn SpecialMoves>,
    prompt: Option<Prompt>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Game::from_board(Board::standard(), Color::White)
    }

    pub fn from_board(board: Board, to_move: Color) -> Self {
        Game {
            start: Turn::root(board, to_move),
            history: Vec::new(),
            special: Box::new(StandardSpecialMoves),
            prompt: None,
        }
    }

    pub fn with_special(mut self, special: Box<dyn SpecialMoves>) -> Self {
        self.special = special;
        self
    }

    /// Ask `prompt` which piece a pawn becomes on the far rank.
    pub fn with_promotion_prompt(mut self, prompt: impl Fn() -> Promotion + Send + Sync + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    pub fn context(&self) -> MoveContext<'_> {
        let ctx = MoveContext::new(self.special.as_ref());
        match &self.prompt {
            Some(prompt) => ctx.with_prompt(&**prompt),
            None => ctx,
        }
    }

    /// The latest accepted turn, or the starting point.
    pub fn current(&self) -> &Turn {
        self.history.last().unwrap_or(&self.start)
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.history.last()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn board(&self) -> &Board {
        self.current().board()
    }

    pub fn to_move(&self) -> Color {
        self.current().to_move()
    }

    /// Turn number the next accepted move will carry.
    pub fn next_number(&self) -> u32 {
        self.current().number() + 1
    }

    /// The turn `text` would produce, or `None` when the command is malformed,
    /// names a missing piece or a piece of the wrong side, or the move is
    /// illegal.
    pub fn try_command(&self, text: &str) -> Result<Option<Turn>> {
        let Some((piece, to)) = command::parse(text).and_then(|cmd| cmd.resolve(self.board())) else {
            debug!("unrecognised command {text:?}");
            return Ok(None);
        };
        if piece.color != self.to_move() {
            debug!("{} cannot move on {}'s turn", piece.name(), self.to_move());
            return Ok(None);
        }
        let ctx = self.context();
        let turn = Turn::new(self.next_number(), self.board(), &piece, to, &ctx)?;
        if !turn.is_valid() || check::is_king_in_check(&turn, ctx.special) {
            return Ok(None);
        }
        Ok(Some(turn))
    }

    /// Play `text`. Returns the accepted turn, or `None` when it was refused.
    pub fn play(&mut self, text: &str) -> Result<Option<&Turn>> {
        match self.try_command(text)? {
            Some(turn) => {
                self.history.push(turn);
                Ok(self.history.last())
            }
            None => Ok(None),
        }
    }

    /// Accept a turn produced elsewhere, e.g. picked from [`Game::legal_turns`].
    pub fn push(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    pub fn legal_turns(&self) -> Result<Vec<Turn>> {
        legal_turns(self.current(), &self.context())
    }

    /// The side to move is in check.
    pub fn is_check(&self) -> bool {
        check::is_in_check(self.board(), self.to_move(), self.special.as_ref())
    }

    pub fn is_checkmate(&self) -> Result<bool> {
        check::is_checkmate(self.current(), &self.context())
    }

    pub fn is_stalemate(&self) -> Result<bool> {
        check::is_stalemate(self.current(), &self.context())
    }

    pub fn is_over(&self) -> Result<bool> {
        Ok(self.legal_turns()?.is_empty())
    }
}
