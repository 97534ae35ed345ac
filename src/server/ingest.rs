//! Ingestion HTTP server with axum router and graceful shutdown.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::error::ServerError;
use super::handlers::{get_events_sse, get_health, post_data};
use super::state::AppState;
use crate::config::ServerConfig;

/// Largest accepted request body.
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

/// HTTP server for payload ingestion and event streaming.
pub struct IngestServer {
    config: ServerConfig,
    state: AppState,
    cancel: CancellationToken,
}

impl IngestServer {
    /// Create a server with default configuration.
    #[must_use]
    pub fn new(state: AppState, cancel: CancellationToken) -> Self {
        Self {
            config: ServerConfig::default(),
            state,
            cancel,
        }
    }

    /// Set the server configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(get_health))
            .route("/data", post(post_data))
            .route("/events", get(get_events_sse))
            .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Bind to the configured address and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `Bind` if the address cannot be bound, or `Serve` if the
    /// server fails while running.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Bind the configured address without serving yet.
    ///
    /// # Errors
    ///
    /// Returns `Bind` if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.address();
        TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `Serve` if the server fails while running.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let cancel = self.cancel.clone();
        let app = self.build_router();

        if let Ok(local) = listener.local_addr() {
            tracing::info!(address = %local, "Starting ingestion server");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Ingestion server shutting down gracefully");
            })
            .await?;
        Ok(())
    }
}
