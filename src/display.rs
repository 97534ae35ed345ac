//! Colored CLI display utilities for relayed events.
//!
//! This module provides functions for printing colored, formatted output
//! to the terminal while logs are being tailed.

use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

use crate::sink::RelayEvent;
use crate::watcher::{LogEntry, LogLevel};

/// Maximum length for a log line before it is shortened.
const DEFAULT_MAX_LEN: usize = 200;

/// Maximum length for a displayed payload.
const PAYLOAD_MAX_LEN: usize = 120;

/// Format a timestamp in the same format as tracing.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate a string to at most `max_len` characters, adding ellipsis if truncated.
///
/// Counts characters rather than bytes, so multi-byte text is never split.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// Bracketed severity tag, padded so lines align.
#[must_use]
pub fn level_tag(level: LogLevel) -> String {
    let tag = format!("[{}]", level.as_str().to_uppercase());
    let padded = format!("{tag:<9}");
    match level {
        LogLevel::Error => padded.red().bold().to_string(),
        LogLevel::Warning => padded.yellow().bold().to_string(),
        LogLevel::Info => padded.blue().bold().to_string(),
        LogLevel::Debug => padded.dimmed().to_string(),
        LogLevel::Success => padded.green().bold().to_string(),
    }
}

/// Format a log entry as `file:line text` without colors.
#[must_use]
pub fn format_log_entry(entry: &LogEntry, raw_mode: bool) -> String {
    format!(
        "{}:{} {}",
        entry.file_name,
        entry.line_num,
        truncate(&entry.line, DEFAULT_MAX_LEN, raw_mode)
    )
}

/// Compact a JSON payload onto one line for display.
///
/// Bodies that do not parse are shown as received.
#[must_use]
pub fn format_payload(body: &str, raw_mode: bool) -> String {
    let compact = serde_json::from_str::<serde_json::Value>(body)
        .map_or_else(|_| body.to_string(), |value| value.to_string());
    truncate(&compact, PAYLOAD_MAX_LEN, raw_mode)
}

/// Print a log entry.
pub fn print_log_entry(entry: &LogEntry, raw_mode: bool) {
    let line = truncate(&entry.line, DEFAULT_MAX_LEN, raw_mode);
    let line = match entry.level {
        LogLevel::Error => line.red().to_string(),
        LogLevel::Debug => line.dimmed().to_string(),
        _ => line,
    };
    println!(
        "{} {} {} {}",
        format_timestamp(entry.timestamp).dimmed(),
        level_tag(entry.level),
        format!("{}:{}", entry.file_name, entry.line_num).cyan(),
        line
    );
    let _ = io::stdout().flush();
}

/// Print a payload received on the ingestion endpoint.
pub fn print_payload(body: &str, raw_mode: bool) {
    println!(
        "{} {} {}",
        format_timestamp(Utc::now()).dimmed(),
        "[DATA]".magenta().bold(),
        format_payload(body, raw_mode)
    );
    let _ = io::stdout().flush();
}

/// Print any relay event.
pub fn print_event(event: &RelayEvent, raw_mode: bool) {
    match event {
        RelayEvent::LogLine(entry) => print_log_entry(entry, raw_mode),
        RelayEvent::Payload(body) => print_payload(body, raw_mode),
    }
}

/// Print a relay event as a single JSON line.
pub fn print_event_json(event: &RelayEvent) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, event = event.name(), "Failed to serialize event"),
    }
    let _ = io::stdout().flush();
}

/// Print a folder heading for the `files` listing.
pub fn print_folder(root: &Path, file_count: usize) {
    println!(
        "{} {} ({} files)",
        "[FOLDER]".blue().bold(),
        root.display(),
        file_count
    );
}

/// Print a file that would be tracked.
pub fn print_tracked_file(path: &Path) {
    println!("  {}", path.display().dimmed());
}

/// Print a folder that will not be watched.
pub fn print_folder_skipped(path: &Path, reason: &str) {
    println!(
        "{} {} - {}",
        "[SKIP]".yellow().bold(),
        path.display(),
        reason.dimmed()
    );
}

/// Print the address the ingestion server listens on.
pub fn print_listening(address: &str) {
    println!(
        "{} {} http://{}",
        format_timestamp(Utc::now()).dimmed(),
        "[SERVER]".green().bold(),
        address
    );
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}
