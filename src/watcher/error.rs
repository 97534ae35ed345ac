//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while watching log folders.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// `start` was called while the watcher is already running.
    #[error("Log watcher is already running")]
    AlreadyRunning,

    /// No enabled folder could be subscribed.
    #[error("No enabled log folders available")]
    NoFoldersAvailable,

    /// Configured folder does not exist.
    #[error("Folder does not exist: {0}")]
    FolderNotFound(PathBuf),

    /// Configured folder path is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    /// A file pattern could not be compiled.
    #[error("Invalid file pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking folder scan panicked or was cancelled.
    #[error("Folder scan failed: {0}")]
    Scan(#[from] tokio::task::JoinError),
}
