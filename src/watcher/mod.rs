//! Log folder watching and tailing.
//!
//! Discovers log files in configured folders, follows appends as they are
//! written, and classifies each new line by severity.

mod cursor;
mod discovery;
mod entry;
mod error;
mod level;
mod manager;
mod pattern;
mod tailer;
mod transient;

pub use cursor::FileCursor;
pub use discovery::{find_matching_files, owning_folder, validate_folder, WatchedFolder};
pub use entry::LogEntry;
pub use error::WatcherError;
pub use level::{detect_log_level, matches_filter, LogLevel, UnknownLevel};
pub use manager::LogWatcher;
pub use pattern::PatternSet;
pub use tailer::{TailReader, DEFAULT_MAX_LINES_PER_READ, DEFAULT_MAX_LINE_BYTES};
pub use transient::{is_transient, transient_kind, TransientError};
