//! Per-file read progress and the registry that owns it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Mutex;

/// Read progress for one tracked file.
///
/// No file handle is kept here; the tail reader reopens the file on every
/// change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCursor {
    path: PathBuf,
    /// Bytes already delivered downstream.
    last_read_offset: u64,
    /// File size observed at the last successful read.
    last_known_size: u64,
    /// Modification time observed at the last successful read.
    last_modified: Option<SystemTime>,
    /// The last read stopped inside an oversized line; skip to its newline.
    discarding: bool,
}

impl FileCursor {
    /// Create a cursor with explicit progress.
    #[must_use]
    pub fn new(path: PathBuf, offset: u64) -> Self {
        Self {
            path,
            last_read_offset: offset,
            last_known_size: offset,
            last_modified: None,
            discarding: false,
        }
    }

    /// Create a cursor positioned at the current end of `path`.
    ///
    /// Content already in the file is never replayed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stat'ed, or if `path` is not a
    /// regular file.
    pub fn at_end(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            last_read_offset: metadata.len(),
            last_known_size: metadata.len(),
            last_modified: metadata.modified().ok(),
            discarding: false,
        })
    }

    /// Path of the tracked file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset already delivered.
    #[must_use]
    pub fn last_read_offset(&self) -> u64 {
        self.last_read_offset
    }

    /// File size at the last successful read.
    #[must_use]
    pub fn last_known_size(&self) -> u64 {
        self.last_known_size
    }

    /// Modification time at the last successful read.
    #[must_use]
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Whether the next read starts inside a truncated line whose rest is
    /// still being skipped.
    #[must_use]
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Restart from the beginning of the file after a truncation or rotation.
    pub fn reset(&mut self) {
        self.last_read_offset = 0;
        self.last_known_size = 0;
        self.discarding = false;
    }

    /// Record a successful read.
    pub(crate) fn advance(&mut self, offset: u64, size: u64, modified: Option<SystemTime>) {
        self.last_read_offset = offset;
        self.last_known_size = size;
        self.last_modified = modified;
    }

    pub(crate) fn set_discarding(&mut self, discarding: bool) {
        self.discarding = discarding;
    }
}

/// A cursor shared between the registry and an in-flight tail read.
pub(crate) type SharedCursor = Arc<Mutex<FileCursor>>;

/// All tracked files, keyed by path.
#[derive(Debug, Default)]
pub(crate) struct CursorRegistry {
    cursors: HashMap<PathBuf, SharedCursor>,
}

impl CursorRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Track a cursor. An existing cursor for the same path is kept.
    ///
    /// Returns `true` if the cursor was inserted.
    pub(crate) fn register(&mut self, cursor: FileCursor) -> bool {
        if self.cursors.contains_key(cursor.path()) {
            return false;
        }
        self.cursors
            .insert(cursor.path().to_path_buf(), Arc::new(Mutex::new(cursor)));
        true
    }

    pub(crate) fn get(&self, path: &Path) -> Option<SharedCursor> {
        self.cursors.get(path).cloned()
    }

    pub(crate) fn contains(&self, path: &Path) -> bool {
        self.cursors.contains_key(path)
    }

    /// Stop tracking a path. Returns `true` if it was tracked.
    pub(crate) fn remove(&mut self, path: &Path) -> bool {
        self.cursors.remove(path).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.cursors.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.cursors.clear();
    }

    /// Tracked paths in sorted order.
    pub(crate) fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.cursors.keys().cloned().collect();
        paths.sort();
        paths
    }
}
