//! # Dropline
//!
//! WebSocket server for turn-based two-player games.
//!
//! One connection creates a game and receives two capability tokens: the
//! *play* token admits the opponent, the *watch* token admits any number
//! of spectators. Every accepted move is broadcast to everyone in the
//! game, and late joiners are replayed the moves they missed.
//!
//! Game rules live behind the [`GameEngine`] trait;
//! [`ConnectFour`] is the bundled implementation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dropline::prelude::*;
//!
//! # async fn serve() -> Result<(), DroplineError> {
//! let server = DroplineServerBuilder::new()
//!     .bind("0.0.0.0:8001")
//!     .build::<ConnectFour>()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use error::DroplineError;
pub use server::{DroplineServer, DroplineServerBuilder};

/// Everything needed to stand up a server or write a client against it.
pub mod prelude {
    pub use crate::{
        DEFAULT_PORT, DroplineError, DroplineServer, DroplineServerBuilder,
        ServerConfig,
    };
    pub use dropline_engine::{ConnectFour, GameEngine, MoveError};
    pub use dropline_protocol::{
        ClientMessage, Codec, JsonCodec, Player, ProtocolError, ServerMessage,
    };
    pub use dropline_session::{SessionError, SessionRegistry};
    pub use dropline_transport::TransportError;
}
