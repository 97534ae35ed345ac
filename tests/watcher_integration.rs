//! Integration tests for the log watcher against a real filesystem.
//!
//! Tests that cannot obtain an OS watch (inotify limits, sandboxed
//! environments) print a notice and return early.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tailrelay::config::FolderSpec;
use tailrelay::sink::RelayEvent;
use tailrelay::watcher::{LogEntry, LogLevel, LogWatcher, WatcherError};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

fn canonical_tempdir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let root = std::fs::canonicalize(dir.path()).expect("Failed to canonicalize temp dir");
    (dir, root)
}

fn new_watcher() -> (LogWatcher, mpsc::UnboundedReceiver<RelayEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LogWatcher::new(Arc::new(tx)), rx)
}

/// Start the watcher, or return `false` if the platform refused a watch.
async fn start_or_skip(watcher: &LogWatcher, folders: Vec<FolderSpec>) -> bool {
    match watcher.start(folders).await {
        Ok(()) => true,
        Err(WatcherError::Notify(e)) => {
            eprintln!("Skipping test due to system limit: {e}");
            false
        }
        Err(e) => panic!("Unexpected error starting watcher: {e}"),
    }
}

fn append(path: &Path, content: &str) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .expect("Failed to open log for append");
    file.write_all(content.as_bytes())
        .expect("Failed to append to log");
    file.flush().expect("Failed to flush log");
}

async fn next_entry(rx: &mut mpsc::UnboundedReceiver<RelayEvent>) -> LogEntry {
    let event = timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("Timed out waiting for a log line")
        .expect("Event channel closed");
    match event {
        RelayEvent::LogLine(entry) => entry,
        other => panic!("Expected a log line, got {other:?}"),
    }
}

async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<RelayEvent>) {
    tokio::time::sleep(QUIET_PERIOD).await;
    if let Ok(event) = rx.try_recv() {
        panic!("Unexpected event: {event:?}");
    }
}

async fn wait_until_tracked(watcher: &LogWatcher, path: &Path) {
    let tracked = timeout(EVENT_TIMEOUT, async {
        while !watcher.tracked_files().iter().any(|p| p == path) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(tracked.is_ok(), "{} was never admitted", path.display());
}

#[tokio::test]
async fn test_appended_line_is_relayed_once() {
    let (_dir, root) = canonical_tempdir();
    let log = root.join("app.log");
    std::fs::write(&log, "old line one\nold line two\n").unwrap();

    let (watcher, mut rx) = new_watcher();
    if !start_or_skip(&watcher, vec![FolderSpec::new(&root).with_extensions(["*.log"])]).await {
        return;
    }

    append(&log, "[ERROR] boom\n");

    let entry = next_entry(&mut rx).await;
    assert_eq!(entry.line, "[ERROR] boom");
    assert_eq!(entry.level, LogLevel::Error);
    assert_eq!(entry.file_path, log);
    assert_eq!(entry.file_name, "app.log");
    assert_eq!(entry.line_num, 1);

    assert_quiet(&mut rx).await;
    watcher.stop().await;
}

#[tokio::test]
async fn test_lines_arrive_in_file_order() {
    let (_dir, root) = canonical_tempdir();
    let log = root.join("app.log");
    std::fs::write(&log, "").unwrap();

    let (watcher, mut rx) = new_watcher();
    if !start_or_skip(&watcher, vec![FolderSpec::new(&root).with_extensions(["*.log"])]).await {
        return;
    }

    append(&log, "[INFO] first\n[WARN] second\n");
    append(&log, "[SUCCESS] third\n");

    let lines: Vec<(String, LogLevel)> = [
        next_entry(&mut rx).await,
        next_entry(&mut rx).await,
        next_entry(&mut rx).await,
    ]
    .into_iter()
    .map(|e| (e.line, e.level))
    .collect();

    assert_eq!(
        lines,
        vec![
            ("[INFO] first".to_string(), LogLevel::Info),
            ("[WARN] second".to_string(), LogLevel::Warning),
            ("[SUCCESS] third".to_string(), LogLevel::Success),
        ]
    );
    watcher.stop().await;
}

#[tokio::test]
async fn test_folder_filters_drop_other_levels() {
    let (_dir, root) = canonical_tempdir();
    let log = root.join("app.log");
    std::fs::write(&log, "").unwrap();

    let (watcher, mut rx) = new_watcher();
    let spec = FolderSpec::new(&root)
        .with_extensions(["*.log"])
        .with_filters(["error"]);
    if !start_or_skip(&watcher, vec![spec]).await {
        return;
    }

    append(&log, "[INFO] ignored\n[ERROR] kept\n[DEBUG] ignored\n");

    let entry = next_entry(&mut rx).await;
    assert_eq!(entry.line, "[ERROR] kept");
    assert_eq!(entry.line_num, 2);
    assert_quiet(&mut rx).await;
    watcher.stop().await;
}

#[tokio::test]
async fn test_unmatched_files_are_ignored() {
    let (_dir, root) = canonical_tempdir();
    let notes = root.join("notes.txt");
    std::fs::write(&notes, "").unwrap();

    let (watcher, mut rx) = new_watcher();
    if !start_or_skip(&watcher, vec![FolderSpec::new(&root).with_extensions(["*.log"])]).await {
        return;
    }

    assert!(watcher.tracked_files().is_empty());
    append(&notes, "[ERROR] not a log\n");
    assert_quiet(&mut rx).await;
    watcher.stop().await;
}

#[tokio::test]
async fn test_new_file_is_admitted_and_tailed() {
    let (_dir, root) = canonical_tempdir();

    let (watcher, mut rx) = new_watcher();
    if !start_or_skip(&watcher, vec![FolderSpec::new(&root).with_extensions(["*.log"])]).await {
        return;
    }
    assert!(watcher.tracked_files().is_empty());

    let log = root.join("fresh.log");
    std::fs::File::create(&log).unwrap();
    wait_until_tracked(&watcher, &log).await;

    append(&log, "[WARNING] disk almost full\n");

    let entry = next_entry(&mut rx).await;
    assert_eq!(entry.line, "[WARNING] disk almost full");
    assert_eq!(entry.level, LogLevel::Warning);
    assert_eq!(entry.file_name, "fresh.log");
    watcher.stop().await;
}

#[tokio::test]
async fn test_new_file_in_subdirectory_is_admitted() {
    let (_dir, root) = canonical_tempdir();
    let nested = root.join("service");
    std::fs::create_dir(&nested).unwrap();

    let (watcher, mut rx) = new_watcher();
    if !start_or_skip(&watcher, vec![FolderSpec::new(&root).with_extensions(["*.log"])]).await {
        return;
    }

    let log = nested.join("worker.log");
    std::fs::File::create(&log).unwrap();
    wait_until_tracked(&watcher, &log).await;

    append(&log, "worker started\n");
    assert_eq!(next_entry(&mut rx).await.line, "worker started");
    watcher.stop().await;
}

#[tokio::test]
async fn test_truncated_file_is_read_from_start() {
    let (_dir, root) = canonical_tempdir();
    let log = root.join("rotating.log");
    std::fs::write(&log, "a much longer line that was written before rotation\n").unwrap();

    let (watcher, mut rx) = new_watcher();
    if !start_or_skip(&watcher, vec![FolderSpec::new(&root).with_extensions(["*.log"])]).await {
        return;
    }

    std::fs::write(&log, "fresh\n").unwrap();

    let entry = next_entry(&mut rx).await;
    assert_eq!(entry.line, "fresh");
    watcher.stop().await;
}

#[tokio::test]
async fn test_start_without_folders_fails() {
    let (watcher, _rx) = new_watcher();

    match watcher.start(Vec::new()).await {
        Err(WatcherError::NoFoldersAvailable) => {}
        Err(WatcherError::Notify(e)) => {
            eprintln!("Skipping test due to system limit: {e}");
            return;
        }
        other => panic!("Expected NoFoldersAvailable, got {other:?}"),
    }
    assert!(!watcher.is_running().await);
}

#[tokio::test]
async fn test_start_with_only_unusable_folders_fails() {
    let (_dir, root) = canonical_tempdir();
    let (watcher, _rx) = new_watcher();

    let folders = vec![
        FolderSpec::new("/definitely/not/a/real/folder"),
        FolderSpec::new(&root).enabled(false),
    ];
    match watcher.start(folders).await {
        Err(WatcherError::NoFoldersAvailable) => {}
        Err(WatcherError::Notify(e)) => {
            eprintln!("Skipping test due to system limit: {e}");
            return;
        }
        other => panic!("Expected NoFoldersAvailable, got {other:?}"),
    }
    assert!(!watcher.is_running().await);
}

#[tokio::test]
async fn test_missing_folder_is_skipped() {
    let (_dir, root) = canonical_tempdir();
    std::fs::write(root.join("app.log"), "").unwrap();

    let (watcher, _rx) = new_watcher();
    let folders = vec![
        FolderSpec::new(root.join("missing")),
        FolderSpec::new(&root).with_extensions(["*.log"]),
    ];
    if !start_or_skip(&watcher, folders).await {
        return;
    }

    assert!(watcher.is_running().await);
    assert_eq!(watcher.watched_folders(), vec![root.clone()]);
    assert_eq!(watcher.tracked_files(), vec![root.join("app.log")]);
    watcher.stop().await;
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let (_dir, root) = canonical_tempdir();
    let (watcher, _rx) = new_watcher();
    if !start_or_skip(&watcher, vec![FolderSpec::new(&root)]).await {
        return;
    }

    let again = watcher.start(vec![FolderSpec::new(&root)]).await;
    assert!(matches!(again, Err(WatcherError::AlreadyRunning)));
    assert!(watcher.is_running().await);
    watcher.stop().await;
}

#[tokio::test]
async fn test_stop_silences_watcher_and_allows_restart() {
    let (_dir, root) = canonical_tempdir();
    let log = root.join("app.log");
    std::fs::write(&log, "").unwrap();

    let (watcher, mut rx) = new_watcher();
    let folders = vec![FolderSpec::new(&root).with_extensions(["*.log"])];
    if !start_or_skip(&watcher, folders.clone()).await {
        return;
    }

    watcher.stop().await;
    assert!(!watcher.is_running().await);
    assert!(watcher.tracked_files().is_empty());

    append(&log, "written while stopped\n");
    assert_quiet(&mut rx).await;

    // A restart tracks from the current end, so the line above is not replayed
    if !start_or_skip(&watcher, folders).await {
        return;
    }
    append(&log, "written after restart\n");
    assert_eq!(next_entry(&mut rx).await.line, "written after restart");
    watcher.stop().await;
}

#[tokio::test]
async fn test_deleted_file_is_untracked() {
    let (_dir, root) = canonical_tempdir();
    let log = root.join("app.log");
    std::fs::write(&log, "").unwrap();

    let (watcher, _rx) = new_watcher();
    if !start_or_skip(&watcher, vec![FolderSpec::new(&root).with_extensions(["*.log"])]).await {
        return;
    }
    assert_eq!(watcher.tracked_files(), vec![log.clone()]);

    std::fs::remove_file(&log).unwrap();
    let untracked = timeout(EVENT_TIMEOUT, async {
        while !watcher.tracked_files().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(untracked.is_ok(), "Deleted file was still tracked");
    watcher.stop().await;
}
