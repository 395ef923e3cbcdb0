//! Codec trait and implementations for serializing/deserializing messages.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode messages to text and decode bytes back.
///
/// Encoding produces a `String` because every frame on the wire is a
/// text frame; decoding accepts raw bytes so binary frames carrying the
/// same JSON are understood too.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use dropline_protocol::{Codec, JsonCodec, Player, ServerMessage};
///
/// let codec = JsonCodec;
/// let msg = ServerMessage::Win { player: Player::Red };
///
/// let text = codec.encode(&msg).unwrap();
/// assert_eq!(text, r#"{"type":"win","player":"red"}"#);
///
/// let decoded: ServerMessage = codec.decode(text.as_bytes()).unwrap();
/// assert_eq!(decoded, msg);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
