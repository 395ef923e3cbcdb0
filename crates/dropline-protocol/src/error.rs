//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// Every variant is a protocol violation from the connection's point of
/// view: the handler that hits one stops serving that connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown `type`, missing
    /// or extra fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A well-formed message arrived in a state that doesn't accept it.
    #[error("unexpected {got} message, expected {expected}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    /// The message decoded but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
