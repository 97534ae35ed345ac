//! Shared handler state.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::sink::{EventSink, RelayEvent};

/// Default capacity for the event broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Where accepted payloads are delivered.
    pub sink: Arc<dyn EventSink>,
    /// Feed that SSE clients subscribe to.
    pub feed: broadcast::Sender<RelayEvent>,
}

impl AppState {
    /// Create state whose payloads go straight to the SSE feed.
    #[must_use]
    pub fn new(feed: broadcast::Sender<RelayEvent>) -> Self {
        Self {
            sink: Arc::new(feed.clone()),
            feed,
        }
    }

    /// Deliver payloads to a different sink (builder pattern).
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Number of connected SSE clients.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.feed.receiver_count()
    }
}
