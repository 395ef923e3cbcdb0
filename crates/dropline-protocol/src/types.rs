//! Message types for Dropline's wire format.
//!
//! Every message is a JSON object whose `type` field names the variant
//! (`#[serde(tag = "type")]`), so a client can dispatch on
//! `event.type` without unwrapping an outer envelope:
//!
//! ```text
//! {"type": "play", "player": "red", "column": 3, "row": 0}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One of the two player slots of a game.
///
/// The session creator plays [`Player::Red`] and moves first; the
/// connection that joins with the play token plays [`Player::Yellow`].
/// On the wire this is the lowercase colour name, which browser clients
/// use directly as the CSS class of a disc.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Red,
    Yellow,
}

impl Player {
    /// Both slots, in the order they are filled.
    pub const ALL: [Player; 2] = [Player::Red, Player::Yellow];

    /// Returns the opponent.
    pub fn other(self) -> Player {
        match self {
            Player::Red => Player::Yellow,
            Player::Yellow => Player::Red,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Red => write!(f, "red"),
            Player::Yellow => write!(f, "yellow"),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Messages a client sends to the server.
///
/// Unknown fields are rejected so that a malformed request is a decode
/// error (protocol violation) rather than silently half-understood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum ClientMessage {
    /// First message on every connection.
    ///
    /// - neither token: create a new game
    /// - `join`: take the second player slot of an existing game
    /// - `watch`: attach to an existing game as a spectator
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        watch: Option<String>,
    },

    /// Drop a disc into `column`.
    Play { column: i32 },
}

impl ClientMessage {
    /// The wire name of this message's `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Init { .. } => "init",
            ClientMessage::Play { .. } => "play",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Messages the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Reply to a creating `init`: the two capability tokens of the new game.
    Init { join: String, watch: String },

    /// A disc landed. Sent live to every participant and replayed, in
    /// order, to late joiners.
    Play {
        player: Player,
        column: i32,
        row: usize,
    },

    /// The game has a winner.
    Win { player: Player },

    /// A recoverable failure, sent only to the connection that caused it.
    Error { message: String },
}

impl ServerMessage {
    /// Builds an [`ServerMessage::Error`] from anything displayable.
    pub fn error(message: impl fmt::Display) -> Self {
        ServerMessage::Error {
            message: message.to_string(),
        }
    }
}
