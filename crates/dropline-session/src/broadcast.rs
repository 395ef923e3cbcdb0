//! Fan-out of one message to many participants.

use dropline_protocol::ServerMessage;
use dropline_transport::ConnectionId;

use crate::Outbound;

/// Delivers `message` to every recipient and returns how many accepted it.
///
/// `recipients` is a snapshot taken by the caller. A recipient whose
/// receiving half is gone (its connection already closed) is skipped; its
/// own handler removes it from the session on the way out.
pub fn broadcast<'a>(
    recipients: impl IntoIterator<Item = (ConnectionId, &'a Outbound)>,
    message: &ServerMessage,
) -> usize {
    let mut delivered = 0;
    for (conn_id, outbound) in recipients {
        match outbound.send(message.clone()) {
            Ok(()) => delivered += 1,
            Err(_) => {
                tracing::trace!(%conn_id, "recipient gone, skipping");
            }
        }
    }
    delivered
}
