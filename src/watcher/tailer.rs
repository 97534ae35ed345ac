//! Incremental log file reader.
//!
//! Reads lines appended to a file since its cursor was last advanced. The
//! file is opened for each read and closed before returning, so no handle
//! outlives a single invocation and rotated files are picked up by path.

use std::io::SeekFrom;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};

use super::cursor::FileCursor;
use super::entry::LogEntry;
use super::error::WatcherError;
use super::level::matches_filter;
use super::transient::transient_kind;

/// Maximum number of lines scanned per invocation.
pub const DEFAULT_MAX_LINES_PER_READ: usize = 1000;

/// Maximum bytes kept from a single line (1 MiB).
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Reads new lines for a [`FileCursor`], bounded by line and byte caps.
///
/// Content beyond the line cap stays unread and is picked up on the next
/// change notification. A trailing line without a newline is left for the
/// next read so that a line written in several chunks is delivered whole.
#[derive(Debug, Clone, Copy)]
pub struct TailReader {
    max_lines: usize,
    max_line_bytes: usize,
}

impl Default for TailReader {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES_PER_READ,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl TailReader {
    /// Create a reader with the default caps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader with custom caps. Zero values are raised to 1.
    #[must_use]
    pub fn with_limits(max_lines: usize, max_line_bytes: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
            max_line_bytes: max_line_bytes.max(1),
        }
    }

    /// Lines scanned per invocation.
    #[must_use]
    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Bytes kept per line.
    #[must_use]
    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }

    /// Read lines appended since the cursor's offset.
    ///
    /// Returns the entries whose level passes `filters` (empty = all), in
    /// file order. Blank lines are delivered as `info` entries. The cursor is
    /// advanced past every line scanned, including filtered ones.
    ///
    /// A missing file or a transient lock/sharing failure yields no entries
    /// and leaves the cursor where it was. If the file is now smaller than
    /// the offset it was rotated or truncated, and reading restarts at 0.
    ///
    /// # Errors
    ///
    /// Returns an error for any other I/O failure (permission denied, etc.).
    pub async fn read_new_lines<S: AsRef<str>>(
        &self,
        cursor: &mut FileCursor,
        filters: &[S],
    ) -> Result<Vec<LogEntry>, WatcherError> {
        let metadata = match tokio::fs::metadata(cursor.path()).await {
            Ok(m) => m,
            // Removal event will clean up the registry
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Self::absorb_transient(cursor, e),
        };
        let current_size = metadata.len();

        if current_size < cursor.last_read_offset() {
            tracing::info!(
                path = %cursor.path().display(),
                old_offset = cursor.last_read_offset(),
                new_len = current_size,
                "Log rotation detected, restarting from beginning"
            );
            cursor.reset();
        }

        let modified = metadata.modified().ok();
        if current_size == cursor.last_read_offset() {
            if modified != cursor.last_modified() {
                tracing::trace!(path = %cursor.path().display(), "Touched without new content");
                cursor.advance(current_size, current_size, modified);
            }
            return Ok(Vec::new());
        }

        match self.scan(cursor, filters).await {
            Ok(outcome) => {
                cursor.advance(outcome.position, current_size, modified);
                cursor.set_discarding(outcome.discarding);
                Ok(outcome.entries)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Self::absorb_transient(cursor, e),
        }
    }

    fn absorb_transient(
        cursor: &FileCursor,
        err: std::io::Error,
    ) -> Result<Vec<LogEntry>, WatcherError> {
        match transient_kind(&err) {
            Some(kind) => {
                tracing::debug!(
                    path = %cursor.path().display(),
                    kind = ?kind,
                    "File busy, retrying on next change"
                );
                Ok(Vec::new())
            }
            None => Err(WatcherError::Io(err)),
        }
    }

    /// Scan complete lines from the cursor offset.
    async fn scan<S: AsRef<str>>(
        &self,
        cursor: &FileCursor,
        filters: &[S],
    ) -> std::io::Result<ScanOutcome> {
        let mut file = File::open(cursor.path()).await?;
        file.seek(SeekFrom::Start(cursor.last_read_offset())).await?;

        let mut reader = BufReader::new(file);
        let mut outcome = ScanOutcome {
            entries: Vec::new(),
            position: cursor.last_read_offset(),
            discarding: cursor.is_discarding(),
        };
        let mut buf = Vec::new();
        let mut line_num = 0;
        let cap = self.max_line_bytes as u64;

        if outcome.discarding {
            let (discarded, finished) = discard_line(&mut reader).await?;
            outcome.position += discarded;
            if !finished {
                return Ok(outcome);
            }
            tracing::debug!(
                path = %cursor.path().display(),
                discarded,
                "Finished skipping oversized line"
            );
            outcome.discarding = false;
        }

        loop {
            if line_num >= self.max_lines {
                tracing::info!(
                    path = %cursor.path().display(),
                    max_lines = self.max_lines,
                    "Max lines per read reached, will continue on next event"
                );
                break;
            }

            buf.clear();
            let bytes_read = (&mut reader).take(cap + 1).read_until(b'\n', &mut buf).await?;
            if bytes_read == 0 {
                break;
            }

            let consumed = if buf.ends_with(b"\n") {
                buf.pop();
                bytes_read as u64
            } else if buf.len() > self.max_line_bytes {
                let (discarded, finished) = discard_line(&mut reader).await?;
                tracing::warn!(
                    path = %cursor.path().display(),
                    max_line_bytes = self.max_line_bytes,
                    discarded,
                    "Line exceeds size limit, truncating"
                );
                buf.truncate(self.max_line_bytes);
                // The writer is still inside this line
                outcome.discarding = !finished;
                bytes_read as u64 + discarded
            } else {
                // Incomplete trailing line, wait for the rest
                break;
            };

            outcome.position += consumed;
            line_num += 1;

            if buf.ends_with(b"\r") {
                buf.pop();
            }
            let line = String::from_utf8_lossy(&buf).into_owned();
            let entry = LogEntry::new(cursor.path(), line, line_num);
            if matches_filter(entry.level.as_str(), filters) {
                outcome.entries.push(entry);
            }

            if outcome.discarding {
                break;
            }
        }

        Ok(outcome)
    }
}

/// Result of one [`TailReader::scan`].
struct ScanOutcome {
    /// Entries that passed the filter, in file order.
    entries: Vec<LogEntry>,
    /// Offset just past the last consumed byte.
    position: u64,
    /// The scan ended inside a truncated line.
    discarding: bool,
}

/// Skip the rest of the current line, up to and including its newline.
///
/// Returns the number of bytes skipped and whether the newline was reached
/// before end of file.
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<(u64, bool)> {
    let mut discarded = 0u64;
    loop {
        let (used, found) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok((discarded, false));
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(used);
        discarded += used as u64;
        if found {
            return Ok((discarded, true));
        }
    }
}
