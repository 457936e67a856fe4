use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use super::ResolutionEvent;

/// Envelope wrapping a resolution event with metadata
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: ResolutionEvent,
}

/// Handle for emitting resolution events
///
/// This is cheaply cloneable and can be shared across tasks.
/// Events are sent through an async channel to whoever consumes them (UI,
/// automation, the CLI printer).
#[derive(Clone)]
pub struct EventHandle {
    tx: mpsc::Sender<EventEnvelope>,
}

/// Create a bounded event channel.
pub fn event_channel(buffer: usize) -> (EventHandle, mpsc::Receiver<EventEnvelope>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventHandle::new(tx), rx)
}

impl EventHandle {
    /// Create a new event handle from a channel sender
    pub fn new(tx: mpsc::Sender<EventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event
    ///
    /// Waits for channel capacity. If the channel is closed, the error is
    /// logged but the caller is not failed.
    pub async fn emit(&self, event: ResolutionEvent) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::error!("Failed to emit resolution event: {}", e);
        }
    }

    /// Try to emit an event without waiting
    ///
    /// Returns true if the event was sent successfully, false otherwise.
    pub fn try_emit(&self, event: ResolutionEvent) -> bool {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit resolution event: {}", e);
                false
            }
        }
    }
}
