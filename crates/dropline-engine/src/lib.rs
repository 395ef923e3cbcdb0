//! Game rules for Dropline.
//!
//! Sessions never look inside a board. They drive a game through the
//! narrow [`GameEngine`] trait: submit a move, learn where it landed,
//! ask whether somebody won. [`ConnectFour`] is the engine the server
//! ships with.

mod connect_four;
mod engine;
mod error;

pub use connect_four::{COLUMNS, ConnectFour, ROWS};
pub use engine::GameEngine;
pub use error::MoveError;
