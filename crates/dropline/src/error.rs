//! Unified error type for the Dropline server.

use dropline_protocol::ProtocolError;
use dropline_session::SessionError;
use dropline_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DroplineError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol violation (undecodable or out-of-place message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (closed, full, already attached).
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "gone",
        ));
        let dropline_err: DroplineError = err.into();
        assert!(matches!(dropline_err, DroplineError::Transport(_)));
        assert!(dropline_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnexpectedMessage {
            expected: "play",
            got: "init",
        };
        let dropline_err: DroplineError = err.into();
        assert!(matches!(dropline_err, DroplineError::Protocol(_)));
        assert_eq!(
            dropline_err.to_string(),
            "unexpected init message, expected play"
        );
    }

    #[test]
    fn test_from_session_error() {
        let dropline_err: DroplineError = SessionError::Full.into();
        assert!(matches!(dropline_err, DroplineError::Session(_)));
    }
}
