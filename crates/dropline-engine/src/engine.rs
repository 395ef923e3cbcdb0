//! The `GameEngine` trait: the seam between sessions and game rules.

use dropline_protocol::Player;

/// Rules of a two-player drop game, as seen by a session.
///
/// A session owns exactly one engine and serializes every call to it, so
/// implementations need no interior synchronization. `Default` creates
/// the engine for a fresh game.
///
/// # Example
///
/// ```rust
/// use dropline_engine::{ConnectFour, GameEngine};
/// use dropline_protocol::Player;
///
/// let mut game = ConnectFour::default();
/// assert_eq!(game.play(Player::Red, 3).unwrap(), 0);
/// assert_eq!(game.play(Player::Yellow, 3).unwrap(), 1);
/// assert_eq!(game.winner(), None);
/// ```
pub trait GameEngine: Default + Send + 'static {
    /// Why a move was refused. Its `Display` text is what the submitting
    /// client sees in the `error` message.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Applies `player`'s move in `column` and returns the landing row.
    ///
    /// # Errors
    /// Fails without changing any state when the move is illegal: the
    /// column is full or out of range, the game has already ended, or
    /// whatever else the rules forbid.
    fn play(&mut self, player: Player, column: i32) -> Result<usize, Self::Error>;

    /// The winning player, once there is one.
    fn winner(&self) -> Option<Player>;
}
