//! HTTP handlers for the ingestion API.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;

use super::state::AppState;
use crate::display::truncate;
use crate::sink::RelayEvent;

/// Characters of a payload shown in debug logs.
const LOG_PREVIEW_CHARS: usize = 1000;

/// Response for GET /health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Liveness check.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// POST /data - Accept a JSON document and relay it.
///
/// Any JSON value is accepted. The body is forwarded as received.
pub async fn post_data(State(state): State<AppState>, body: Bytes) -> (StatusCode, &'static str) {
    if serde_json::from_slice::<serde_json::Value>(&body).is_err() {
        tracing::debug!(bytes = body.len(), "Rejected payload with invalid JSON");
        return (StatusCode::BAD_REQUEST, "Invalid JSON format");
    }

    // Valid JSON is always valid UTF-8
    let Ok(text) = String::from_utf8(body.to_vec()) else {
        return (StatusCode::BAD_REQUEST, "Invalid JSON format");
    };

    tracing::debug!(
        bytes = text.len(),
        payload = %truncate(&text, LOG_PREVIEW_CHARS, false),
        "Received payload"
    );
    state.sink.emit(RelayEvent::Payload(text));

    (StatusCode::OK, "Data received successfully")
}

/// GET /events - SSE stream of relay events.
pub async fn get_events_sse(
    State(state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.feed.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(Event::default().event(event.name()).data(data)))
            }
            Err(_) => None, // Skip lagged messages
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
