//! Messages consumed by the accounting worker.

use tokio::sync::oneshot;

/// A unit of work for [`crate::domain::access_worker::run_access_worker`].
///
/// Decouples the redirect response from the durable increment: handlers
/// enqueue a [`AccessEvent::Hit`] and return immediately.
#[derive(Debug)]
pub enum AccessEvent {
    /// One successful resolve of `code`.
    Hit { code: String },

    /// Acknowledged once every event enqueued before it has completed.
    Flush { ack: oneshot::Sender<()> },
}

impl AccessEvent {
    pub fn hit(code: impl Into<String>) -> Self {
        Self::Hit { code: code.into() }
    }
}
