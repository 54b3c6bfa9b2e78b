use thiserror::Error;

/// Errors raised by the rules engine.
///
/// Illegal moves are not errors: they produce an invalid [`crate::turn::Turn`].
/// The consistency variants carry the canonical identity of the board that
/// was being processed so the broken state can be rebuilt with
/// [`crate::board::Board::from_identity`].
#[derive(Debug, Error)]
pub enum ChessError {
    #[error("invalid position: {0:?}")]
    InvalidPosition(String),

    #[error("invalid board identity: {0}")]
    InvalidIdentity(String),

    #[error("piece {piece} not found in active pieces (board {board})")]
    PieceNotFound { piece: String, board: String },

    #[error("unexpected file distance {distance} between king and rook when castling (board {board})")]
    CastleGeometry { distance: i8, board: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ChessError {
    /// True for broken board/piece invariants, as opposed to bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChessError::PieceNotFound { .. } | ChessError::CastleGeometry { .. })
    }
}

pub type Result<T, E = ChessError> = std::result::Result<T, E>;
