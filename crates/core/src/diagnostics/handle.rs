use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::warn;

use super::DiagnosticEvent;

/// A diagnostic event stamped with the time it was raised.
#[derive(Debug, Clone)]
pub struct DiagnosticEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: DiagnosticEvent,
}

impl DiagnosticEnvelope {
    fn now(event: DiagnosticEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Sending side of the diagnostics channel.
///
/// Clones share one channel. Emitting never fails the caller: a closed or
/// full channel drops the event with a log line.
#[derive(Debug, Clone)]
pub struct DiagnosticsHandle {
    tx: mpsc::Sender<DiagnosticEnvelope>,
}

impl DiagnosticsHandle {
    pub fn new(tx: mpsc::Sender<DiagnosticEnvelope>) -> Self {
        Self { tx }
    }

    /// Waits for channel capacity. Used off the hot path, e.g. after a
    /// rollback.
    pub async fn emit(&self, event: DiagnosticEvent) {
        let event_type = event.event_type();
        if self.tx.send(DiagnosticEnvelope::now(event)).await.is_err() {
            warn!(event_type, "Diagnostics receiver closed, event dropped");
        }
    }

    /// Sends only if there is room. Returns whether the event was queued.
    pub fn try_emit(&self, event: DiagnosticEvent) -> bool {
        let event_type = event.event_type();
        match self.tx.try_send(DiagnosticEnvelope::now(event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event_type, "Diagnostics channel full, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(event_type, "Diagnostics receiver closed, event dropped");
                false
            }
        }
    }
}

/// Creates a diagnostics channel with room for `capacity` pending events.
pub fn create_diagnostics_channel(
    capacity: usize,
) -> (DiagnosticsHandle, mpsc::Receiver<DiagnosticEnvelope>) {
    let (tx, rx) = mpsc::channel(capacity);
    (DiagnosticsHandle::new(tx), rx)
}
