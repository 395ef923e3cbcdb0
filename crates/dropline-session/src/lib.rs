//! Game session coordination for Dropline.
//!
//! This crate owns everything that is shared between the connections of
//! one game:
//!
//! 1. **Tokens**: unguessable capability strings ([`Token`]); the play
//!    token admits the second player, the watch token admits spectators
//! 2. **Registry**: the two token maps pointing at live sessions
//!    ([`SessionRegistry`])
//! 3. **Sessions**: engine, player slots, spectators and the move log
//!    behind one lock ([`Session`])
//! 4. **Fan-out**: delivering one message to every participant
//!    ([`broadcast`]) and replaying history to late joiners
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / handler (above)  ← one task per connection, drives a Session
//!     ↕
//! Session layer (this crate)  ← shared game state, ordering, fan-out
//!     ↕
//! Protocol + engine (below)  ← wire messages, game rules
//! ```

mod broadcast;
mod error;
mod registry;
mod replay;
mod session;
mod token;

pub use broadcast::broadcast;
pub use error::SessionError;
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{MoveRecord, Outbound, Role, Session, SessionId};
pub use token::Token;
