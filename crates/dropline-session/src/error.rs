//! Error types for the session layer.

use dropline_transport::ConnectionId;

use crate::SessionId;

/// Errors that can occur while attaching to a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live session is registered under the presented token.
    #[error("Game not found")]
    NotFound,

    /// The session lost its last participant and was torn down between
    /// the token lookup and the attach.
    #[error("session {0} has ended")]
    Closed(SessionId),

    /// Both player slots are taken.
    #[error("Game is full")]
    Full,

    /// The connection already participates in this session.
    #[error("connection {0} is already attached")]
    AlreadyAttached(ConnectionId),
}

impl SessionError {
    /// The text sent to the client in an `error` message.
    ///
    /// A session that ended under the caller is indistinguishable from an
    /// unknown token from the client's point of view.
    pub fn client_message(&self) -> String {
        match self {
            SessionError::NotFound | SessionError::Closed(_) => {
                SessionError::NotFound.to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_unknown_token() {
        assert_eq!(SessionError::NotFound.client_message(), "Game not found");
    }

    #[test]
    fn test_client_message_closed_session_reads_as_not_found() {
        let err = SessionError::Closed(SessionId::new(4));
        assert_eq!(err.client_message(), "Game not found");
        assert!(err.to_string().contains("S-4"));
    }

    #[test]
    fn test_client_message_full() {
        assert_eq!(SessionError::Full.client_message(), "Game is full");
    }
}
