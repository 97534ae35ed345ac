//! Events relayed to the presentation layer and the sinks that accept them.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::watcher::LogEntry;

/// An event handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RelayEvent {
    /// A line read from a watched log file.
    #[serde(rename = "logLine")]
    LogLine(LogEntry),
    /// A raw JSON body posted to the ingestion endpoint.
    #[serde(rename = "newData")]
    Payload(String),
}

impl RelayEvent {
    /// Event name as seen by clients.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogLine(_) => "logLine",
            Self::Payload(_) => "newData",
        }
    }
}

/// Accepts relay events one at a time.
///
/// Implementations must not block indefinitely; the watcher calls `emit`
/// from its event loop.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: RelayEvent);
}

impl EventSink for mpsc::UnboundedSender<RelayEvent> {
    fn emit(&self, event: RelayEvent) {
        if self.send(event).is_err() {
            tracing::trace!("Event receiver dropped, discarding event");
        }
    }
}

impl EventSink for broadcast::Sender<RelayEvent> {
    fn emit(&self, event: RelayEvent) {
        // No subscribers is not an error
        let _ = self.send(event);
    }
}
