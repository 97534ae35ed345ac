//! Log entries emitted by the tail reader.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::level::{detect_log_level, LogLevel};

/// A single log line with its source and detected severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Full path of the file the line was read from.
    pub file_path: PathBuf,
    /// Basename of the file.
    pub file_name: String,
    /// Line text without the trailing newline.
    pub line: String,
    /// Detected severity.
    pub level: LogLevel,
    /// When the line was read.
    pub timestamp: DateTime<Utc>,
    /// 1-based position of the line within its read batch.
    pub line_num: usize,
}

impl LogEntry {
    /// Create an entry for a line read from `path`, classifying its severity.
    #[must_use]
    pub fn new(path: &Path, line: impl Into<String>, line_num: usize) -> Self {
        let line = line.into();
        Self {
            file_path: path.to_path_buf(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            level: detect_log_level(&line),
            line,
            timestamp: Utc::now(),
            line_num,
        }
    }
}
