//! Replaying a session's history to a connection that joins late.
//!
//! Replayed moves are ordinary `play` messages, so a client applies them
//! with the same code it uses for live moves.

use crate::{MoveRecord, Outbound};

/// Queues every move of `log`, oldest first, on `outbound`.
///
/// Stops early if the receiver is gone; its handler detaches it on the
/// way out.
pub(crate) fn replay(log: &[MoveRecord], outbound: &Outbound) {
    for record in log {
        if outbound.send(record.to_message()).is_err() {
            tracing::trace!("replay target gone, stopping");
            return;
        }
    }
}
