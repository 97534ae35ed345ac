//! HTTP ingestion server.
//!
//! Accepts JSON payloads from external clients and streams every relay event
//! to subscribers over server-sent events.

mod error;
mod handlers;
mod ingest;
mod state;

pub use error::ServerError;
pub use handlers::{get_events_sse, get_health, post_data, HealthResponse};
pub use ingest::{IngestServer, MAX_PAYLOAD_BYTES};
pub use state::{AppState, DEFAULT_EVENT_CHANNEL_CAPACITY};
