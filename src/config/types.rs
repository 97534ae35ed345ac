//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::watcher::{TailReader, DEFAULT_MAX_LINES_PER_READ, DEFAULT_MAX_LINE_BYTES};

/// Default host for the ingestion server.
pub const DEFAULT_HOST: &str = "localhost";

/// Default port for the ingestion server.
pub const DEFAULT_PORT: u16 = 9191;

/// Downstream parsing hint for a folder's files.
///
/// The watcher splits bytes into lines regardless of format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// A folder of log files to monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderSpec {
    /// Directory to watch.
    pub path: PathBuf,
    /// Glob patterns for file names (`*.log`). Empty matches everything.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Severity labels to keep. Empty keeps every line.
    #[serde(default)]
    pub filters: Vec<String>,
    /// Disabled folders are neither watched nor scanned.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Parsing hint for downstream consumers.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_enabled() -> bool {
    true
}

impl FolderSpec {
    /// Create an enabled text folder with no patterns or filters.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extensions: Vec::new(),
            filters: Vec::new(),
            enabled: true,
            format: LogFormat::Text,
        }
    }

    /// Set the file name patterns (builder pattern).
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the severity filters (builder pattern).
    #[must_use]
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the folder (builder pattern).
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the format hint (builder pattern).
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Configuration for the ingestion HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    /// Address as `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-read limits for tailing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TailConfig {
    /// Lines scanned per change notification.
    pub max_lines_per_read: usize,
    /// Bytes kept from a single line; the rest of the line is skipped.
    pub max_line_bytes: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            max_lines_per_read: DEFAULT_MAX_LINES_PER_READ,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl TailConfig {
    /// Build a reader with these limits.
    #[must_use]
    pub fn reader(&self) -> TailReader {
        TailReader::with_limits(self.max_lines_per_read, self.max_line_bytes)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    /// Ingestion server settings.
    pub server: ServerConfig,
    /// Tail read limits.
    pub tail: TailConfig,
    /// Folders to tail, in priority order.
    pub folders: Vec<FolderSpec>,
}

impl RelayConfig {
    /// Folders that are enabled.
    pub fn enabled_folders(&self) -> impl Iterator<Item = &FolderSpec> {
        self.folders.iter().filter(|f| f.enabled)
    }
}
