//! Server error types.

/// Errors that can occur while running the ingestion server.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O failure.
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}
