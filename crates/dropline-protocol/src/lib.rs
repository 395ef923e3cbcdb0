//! Wire protocol for Dropline.
//!
//! This crate defines the messages that browser clients and the server
//! exchange over a connection:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Player`]): JSON
//!   objects whose `type` field selects the variant.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding, or when a message arrives in the wrong state.
//!
//! ```text
//! Transport (bytes) → Protocol (messages) → Session (game context)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, Player, ServerMessage};
