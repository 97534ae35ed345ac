//! Log folder watcher with notify integration.
//!
//! [`LogWatcher`] subscribes each enabled folder to native change
//! notifications, registers the files already present, and runs a single
//! background task that tails files as they change and forwards every
//! classified line to an [`EventSink`].
//!
//! Locking: the folder list and the cursor registry share one `RwLock` that
//! is never held across file I/O or an `.await`. Each cursor has its own
//! async mutex, held for the duration of a tail read of that file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::cursor::{CursorRegistry, FileCursor};
use super::discovery::{owning_folder, WatchedFolder};
use super::error::WatcherError;
use super::tailer::TailReader;
use crate::config::FolderSpec;
use crate::sink::{EventSink, RelayEvent};

/// Folders and cursors of the current run.
#[derive(Debug, Default)]
struct WatchState {
    folders: Vec<WatchedFolder>,
    cursors: CursorRegistry,
}

/// Resources owned by a running watcher.
struct ActiveWatch {
    /// Native subscriptions. Dropping it releases every watch.
    watcher: RecommendedWatcher,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Watches log folders and relays appended lines.
///
/// The watcher is either idle or running. [`start`](Self::start) moves it to
/// running and [`stop`](Self::stop) back to idle; a configuration change is a
/// stop followed by a start with the new folder list.
pub struct LogWatcher {
    state: Arc<RwLock<WatchState>>,
    sink: Arc<dyn EventSink>,
    reader: TailReader,
    active: Mutex<Option<ActiveWatch>>,
}

impl LogWatcher {
    /// Create an idle watcher that emits to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            state: Arc::new(RwLock::new(WatchState::default())),
            sink,
            reader: TailReader::default(),
            active: Mutex::new(None),
        }
    }

    /// Use a tail reader with custom limits (builder pattern).
    #[must_use]
    pub fn with_reader(mut self, reader: TailReader) -> Self {
        self.reader = reader;
        self
    }

    /// Start monitoring `folders`.
    ///
    /// Each enabled folder is validated, subscribed, and walked once; files
    /// that match its patterns are tracked from their current end. Folders
    /// that fail are logged and skipped. Returns once discovery is complete
    /// and the event loop has been spawned.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `AlreadyRunning` if the watcher is running.
    /// - `NoFoldersAvailable` if no enabled folder could be subscribed.
    /// - `Notify` if the native watcher cannot be created.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub async fn start(&self, folders: Vec<FolderSpec>) -> Result<(), WatcherError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(WatcherError::AlreadyRunning);
        }

        tracing::info!(folders = folders.len(), "Starting log watcher");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        let watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                match result {
                    Ok(event) => {
                        let _ = event_tx.send(event);
                    }
                    Err(e) => {
                        let _ = error_tx.send(e);
                    }
                }
            })?;

        // Canonicalize and walk on the blocking pool
        let (watcher, watched, cursors) =
            tokio::task::spawn_blocking(move || Self::add_folders(watcher, folders)).await?;

        if watched.is_empty() {
            tracing::warn!("No enabled log folders were successfully added");
            return Err(WatcherError::NoFoldersAvailable);
        }

        if cursors.is_empty() {
            tracing::info!("No matching files yet, waiting for new files");
        }

        let folder_count = watched.len();
        let file_count = cursors.len();
        {
            let mut state = self.state.write().expect("RwLock poisoned");
            state.folders = watched;
            state.cursors = cursors;
        }

        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher {
            state: Arc::clone(&self.state),
            sink: Arc::clone(&self.sink),
            reader: self.reader,
        };
        let task = tokio::spawn(dispatcher.run(event_rx, error_rx, cancel.clone()));

        *active = Some(ActiveWatch {
            watcher,
            cancel,
            task,
        });

        tracing::info!(
            folders = folder_count,
            files = file_count,
            "Log watcher started, monitoring {folder_count} enabled folders with {file_count} files"
        );
        Ok(())
    }

    /// Validate, subscribe, and scan every enabled folder.
    fn add_folders(
        mut watcher: RecommendedWatcher,
        folders: Vec<FolderSpec>,
    ) -> (RecommendedWatcher, Vec<WatchedFolder>, CursorRegistry) {
        let mut watched = Vec::new();
        let mut cursors = CursorRegistry::new();

        for spec in folders {
            if !spec.enabled {
                tracing::info!(path = %spec.path.display(), "Skipping disabled folder");
                continue;
            }

            let path = spec.path.clone();
            match Self::add_folder(&mut watcher, spec, &mut cursors) {
                Ok(folder) => watched.push(folder),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Error adding folder");
                }
            }
        }

        (watcher, watched, cursors)
    }

    /// Validate, subscribe, and scan one folder.
    fn add_folder(
        watcher: &mut RecommendedWatcher,
        spec: FolderSpec,
        cursors: &mut CursorRegistry,
    ) -> Result<WatchedFolder, WatcherError> {
        let folder = WatchedFolder::resolve(spec)?;
        tracing::info!(
            path = %folder.root().display(),
            patterns = ?folder.patterns().sources(),
            filters = ?folder.filters(),
            format = ?folder.spec().format,
            "Adding folder"
        );
        watcher.watch(folder.root(), RecursiveMode::Recursive)?;

        let files = folder.discover();
        let mut registered = 0;
        for path in &files {
            match FileCursor::at_end(path) {
                Ok(cursor) => {
                    if cursors.register(cursor) {
                        registered += 1;
                        tracing::debug!(path = %path.display(), "Registered file for monitoring");
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Error registering file");
                }
            }
        }

        tracing::info!(
            path = %folder.root().display(),
            registered,
            found = files.len(),
            "Folder added"
        );
        Ok(folder)
    }

    /// Stop monitoring.
    ///
    /// Signals the event loop, waits for it to exit, then releases the native
    /// subscriptions and clears every cursor. Nothing is emitted after this
    /// returns. Calling it while idle does nothing.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub async fn stop(&self) {
        let mut active = self.active.lock().await;
        let Some(ActiveWatch {
            watcher,
            cancel,
            task,
        }) = active.take()
        else {
            return;
        };

        cancel.cancel();
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Event loop ended abnormally");
        }
        drop(watcher);

        let mut state = self.state.write().expect("RwLock poisoned");
        state.cursors.clear();
        state.folders.clear();

        tracing::info!("Log watcher stopped and resources cleaned up");
    }

    /// Returns `true` while the watcher is running.
    pub async fn is_running(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Paths currently tracked, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn tracked_files(&self) -> Vec<PathBuf> {
        self.state.read().expect("RwLock poisoned").cursors.paths()
    }

    /// Canonical roots of the folders being watched.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn watched_folders(&self) -> Vec<PathBuf> {
        self.state
            .read()
            .expect("RwLock poisoned")
            .folders
            .iter()
            .map(|f| f.root().to_path_buf())
            .collect()
    }

    /// Copy of the read progress for a tracked file.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub async fn cursor(&self, path: &Path) -> Option<FileCursor> {
        let cursor = self.state.read().expect("RwLock poisoned").cursors.get(path)?;
        let snapshot = cursor.lock().await.clone();
        Some(snapshot)
    }
}

impl Drop for LogWatcher {
    fn drop(&mut self) {
        // Cannot wait here; the loop exits on its own once cancelled
        if let Some(active) = self.active.get_mut().take() {
            active.cancel.cancel();
        }
    }
}

/// Event loop half of the watcher, moved into the background task.
struct Dispatcher {
    state: Arc<RwLock<WatchState>>,
    sink: Arc<dyn EventSink>,
    reader: TailReader,
}

impl Dispatcher {
    async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<notify::Event>,
        mut errors: mpsc::UnboundedReceiver<notify::Error>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!("Event loop stopping");
                    break;
                }

                event = events.recv() => {
                    let Some(event) = event else {
                        tracing::info!("Watcher events channel closed");
                        break;
                    };
                    self.handle_event(event).await;
                }

                error = errors.recv() => {
                    let Some(error) = error else {
                        tracing::info!("Watcher errors channel closed");
                        break;
                    };
                    tracing::error!(error = %error, paths = ?error.paths, "Watcher error");
                }
            }
        }
    }

    async fn handle_event(&self, event: notify::Event) {
        match event.kind {
            EventKind::Create(_) => {
                for path in &event.paths {
                    self.handle_created(path);
                }
            }
            EventKind::Modify(ModifyKind::Name(mode)) => self.handle_renamed(mode, &event.paths),
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(_) => {
                for path in &event.paths {
                    self.handle_modified(path).await;
                }
            }
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.handle_removed(path);
                }
            }
            _ => {}
        }
    }

    fn handle_renamed(&self, mode: RenameMode, paths: &[PathBuf]) {
        match (mode, paths) {
            (RenameMode::From, _) => paths.iter().for_each(|p| self.handle_removed(p)),
            (RenameMode::To, _) => paths.iter().for_each(|p| self.handle_created(p)),
            (RenameMode::Both, [from, to]) => {
                self.handle_removed(from);
                self.handle_created(to);
            }
            // Platform could not tell which side of the rename this is
            _ => {
                for path in paths {
                    if path.exists() {
                        self.handle_created(path);
                    } else {
                        self.handle_removed(path);
                    }
                }
            }
        }
    }

    /// Admit a new file if an enabled folder claims it.
    fn handle_created(&self, path: &Path) {
        let folders = {
            let state = self.state.read().expect("RwLock poisoned");
            if state.cursors.contains(path) {
                return;
            }
            state.folders.clone()
        };

        if owning_folder(&folders, path).is_none() {
            return;
        }

        let cursor = match FileCursor::at_end(path) {
            Ok(cursor) => cursor,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Not admitting path");
                return;
            }
        };

        let mut state = self.state.write().expect("RwLock poisoned");
        if state.cursors.register(cursor) {
            tracing::info!(path = %path.display(), "Registered new file for monitoring");
        }
    }

    /// Tail a tracked file and forward its new lines.
    async fn handle_modified(&self, path: &Path) {
        let (cursor, filters) = {
            let state = self.state.read().expect("RwLock poisoned");
            let Some(cursor) = state.cursors.get(path) else {
                return;
            };
            let filters = owning_folder(&state.folders, path)
                .map(|f| f.filters().to_vec())
                .unwrap_or_default();
            (cursor, filters)
        };

        let mut cursor = cursor.lock().await;
        match self.reader.read_new_lines(&mut cursor, &filters).await {
            Ok(entries) => {
                for entry in entries {
                    self.sink.emit(RelayEvent::LogLine(entry));
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Error reading new lines");
            }
        }
    }

    fn handle_removed(&self, path: &Path) {
        let mut state = self.state.write().expect("RwLock poisoned");
        if state.cursors.remove(path) {
            tracing::info!(path = %path.display(), "Stopped monitoring file");
        }
    }
}
