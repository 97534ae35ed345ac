//! Keyword-based severity detection for log lines.
//!
//! This is a best-effort tag, not a log parser: a line is lowercased and
//! searched for keywords from an ordered table, and the first category with a
//! hit wins. Short keywords such as `err` and `ok` also match inside longer
//! words, so "token" tags as success and "stderr" as error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Coarse severity assigned to a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Success,
}

/// Keywords per level, checked in order. First match wins.
const LEVEL_KEYWORDS: &[(LogLevel, &[&str])] = &[
    (
        LogLevel::Error,
        &["error", "err", "fatal", "critical", "exception"],
    ),
    (LogLevel::Warning, &["warning", "warn"]),
    (LogLevel::Info, &["info", "information"]),
    (LogLevel::Debug, &["debug", "trace"]),
    (LogLevel::Success, &["success", "ok", "passed"]),
];

impl LogLevel {
    /// All levels in classification order.
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Success,
    ];

    /// Lowercase label used in filters and serialized output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known severity label.
///
/// Labels compare case-insensitively, the same way [`matches_filter`] does.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Unknown log level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

/// Detect the severity of a log line.
///
/// Matching is case-insensitive. Lines without any keyword are `Info`.
#[must_use]
pub fn detect_log_level(line: &str) -> LogLevel {
    let lower = line.to_lowercase();

    LEVEL_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map_or(LogLevel::Info, |(level, _)| *level)
}

/// Check whether a level label passes a folder's filter set.
///
/// An empty filter set accepts everything; otherwise the label must equal
/// one of the filters, ignoring case.
#[must_use]
pub fn matches_filter<S: AsRef<str>>(level: &str, filters: &[S]) -> bool {
    filters.is_empty()
        || filters
            .iter()
            .any(|filter| filter.as_ref().eq_ignore_ascii_case(level))
}
