//! Chess rules engine and state-space explorer.
//!
//! Boards hold an 8x8 occupancy grid plus the pieces standing on it. Moving a
//! piece produces a [`turn::Turn`] on a cloned board; the [`explorer`] walks
//! every legal turn to a fixed depth and memoizes subtree counts in a
//! concurrent [`cache::TranspositionCache`].

pub mod board;
pub mod cache;
pub mod check;
pub mod command;
pub mod error;
pub mod explorer;
pub mod game;
pub mod piece;
pub mod playout;
pub mod position;
pub mod rules;
pub mod special;
pub mod turn;

pub use board::Board;
pub use error::{ChessError, Result};
pub use explorer::{CountMode, Explorer, ExplorerConfig};
pub use piece::{Color, Piece, PieceType, Promotion};
pub use position::Position;
pub use turn::Turn;
