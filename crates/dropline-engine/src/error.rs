//! Error types for the engine layer.

/// Reasons [`ConnectFour`](crate::ConnectFour) refuses a move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// Someone already won.
    #[error("The game is over.")]
    GameOver,

    /// The same player tried to move twice in a row.
    #[error("It isn't your turn.")]
    NotYourTurn,

    /// The column index is outside the board.
    #[error("Column {0} doesn't exist.")]
    NoSuchColumn(i32),

    /// The column has no free row left.
    #[error("This slot is full.")]
    ColumnFull,
}
