//! Folder validation and file discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::error::WatcherError;
use super::level::LogLevel;
use super::pattern::PatternSet;
use crate::config::FolderSpec;

/// A validated folder with its patterns compiled.
///
/// `root` is the canonical form of the configured path; notification paths
/// and discovered files are all rooted at it.
#[derive(Debug, Clone)]
pub struct WatchedFolder {
    spec: FolderSpec,
    root: PathBuf,
    patterns: PatternSet,
}

impl WatchedFolder {
    /// Validate a folder spec and compile its patterns.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` or `NotADirectory` if the path is unusable,
    /// `InvalidPattern` if a pattern cannot be compiled, or `Io` for any
    /// other failure accessing the path.
    pub fn resolve(spec: FolderSpec) -> Result<Self, WatcherError> {
        let root = validate_folder(&spec.path)?;
        let patterns = PatternSet::new(&spec.extensions)?;
        let folder = Self {
            spec,
            root,
            patterns,
        };

        for filter in folder.unknown_filters() {
            tracing::warn!(
                path = %folder.root.display(),
                filter,
                "Unknown level filter, no line will match it"
            );
        }
        Ok(folder)
    }

    /// The folder as configured.
    #[must_use]
    pub fn spec(&self) -> &FolderSpec {
        &self.spec
    }

    /// Canonical directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compiled file name patterns.
    #[must_use]
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Severity filters for lines read from this folder's files.
    #[must_use]
    pub fn filters(&self) -> &[String] {
        &self.spec.filters
    }

    /// Filters that name no known level.
    #[must_use]
    pub fn unknown_filters(&self) -> Vec<&str> {
        self.spec
            .filters
            .iter()
            .map(String::as_str)
            .filter(|filter| filter.parse::<LogLevel>().is_err())
            .collect()
    }

    /// Returns `true` if `path` lies under this folder and its name matches.
    #[must_use]
    pub fn claims(&self, path: &Path) -> bool {
        self.spec.enabled
            && path.starts_with(&self.root)
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| self.patterns.matches(name))
    }

    /// Walk the folder recursively and return every matching regular file.
    ///
    /// Entries that cannot be read are skipped.
    #[must_use]
    pub fn discover(&self) -> Vec<PathBuf> {
        find_matching_files(&self.root, &self.patterns)
    }
}

/// Check that `path` exists and is a directory, returning its canonical form.
///
/// # Errors
///
/// Returns `FolderNotFound`, `NotADirectory`, or `Io`.
pub fn validate_folder(path: &Path) -> Result<PathBuf, WatcherError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatcherError::FolderNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(WatcherError::Io(e)),
    };

    if !metadata.is_dir() {
        return Err(WatcherError::NotADirectory(path.to_path_buf()));
    }

    Ok(std::fs::canonicalize(path)?)
}

/// Find all regular files under `root` whose basename matches `patterns`.
///
/// Symlinks to regular files are included, the same as when such a link is
/// created after the watch starts. Symlinked directories are not descended.
#[must_use]
pub fn find_matching_files(root: &Path, patterns: &PatternSet) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| std::fs::metadata(entry.path()).is_ok_and(|m| m.is_file()))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| patterns.matches(name))
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// First folder that claims `path`.
#[must_use]
pub fn owning_folder<'a>(folders: &'a [WatchedFolder], path: &Path) -> Option<&'a WatchedFolder> {
    folders.iter().find(|folder| folder.claims(path))
}
