//! Model file discovery.
//!
//! A model repository stores each document as a *base* file plus any number of
//! *split* companions that contribute extra fields:
//!
//! ```text
//! Compute/
//! ├── namespaceConfig.json
//! └── Objects/
//!     ├── VM.json            <- base file
//!     ├── VM.health.json     <- companion (token "health")
//!     └── Disk.json
//! ProtectedModels/
//! └── Compute/
//!     └── Objects/
//!         └── VM.scripts.json   <- companion of Compute/Objects/VM.json
//! ```
//!
//! A file is a split file when its stem contains a dot. Split files are never
//! returned as base files; they are pulled in through [`FileSet::list_split_files`].
//!
//! The top-level `ProtectedModels` folder mirrors the regular layout. Its files are
//! matched to base files by *logical* path: the root-relative path with the leading
//! `ProtectedModels` segment removed. Nothing under it is a base file.
//!
//! # Pattern Syntax
//!
//! Base-file patterns are `glob` patterns matched against `/`-separated paths
//! relative to the directory being searched. `*` stays within one path segment and
//! `**` spans any number of segments, including none.

use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::constants::PROTECTED_MODELS_DIR;
use crate::core::{FileOperation, FileOperationContext, FileOperationError, ModelError};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Snapshot of the files under a model root.
///
/// The directory tree is walked once per snapshot; base-file enumeration and
/// companion lookups are answered from it. Hidden directories (`.git`, ...) are
/// skipped and symlinks are not followed.
#[derive(Debug, Clone)]
pub struct FileSet {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl FileSet {
    /// Walk `root` and record every regular file under it.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FileAccess`] when `root` is not a readable directory.
    pub fn scan(root: &Path) -> Result<Self, ModelError> {
        if !root.is_dir() {
            let io =
                std::io::Error::new(std::io::ErrorKind::NotFound, "model root is not a directory");
            let context = FileOperationContext::new(
                FileOperation::Walk,
                root,
                "discovering model files",
                "fileset::scan",
            );
            return Err(FileOperationError::new(context, io).into());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(target: "model::fileset", "Skipping unreadable entry: {err}");
                    continue;
                }
            };
            if entry.file_type().is_file() {
                trace!(target: "model::fileset", "Found {}", entry.path().display());
                files.push(entry.into_path());
            }
        }
        files.sort();

        debug!(target: "model::fileset", "Scanned {} files under {}", files.len(), root.display());
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// [`FileSet::scan`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`FileSet::scan`].
    pub async fn scan_async(root: &Path) -> Result<Self, ModelError> {
        let owned = root.to_path_buf();
        tokio::task::spawn_blocking(move || Self::scan(&owned)).await.map_err(|e| {
            let context = FileOperationContext::new(
                FileOperation::Walk,
                root,
                "discovering model files",
                "fileset::scan_async",
            );
            ModelError::from(FileOperationError::new(context, std::io::Error::other(e.to_string())))
        })?
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every file in the snapshot.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Base files under the root whose root-relative path matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigError`] for an invalid glob pattern.
    pub fn list_base_files(&self, pattern: &str) -> Result<Vec<PathBuf>, ModelError> {
        self.list_base_files_under(&self.root.clone(), pattern)
    }

    /// Base files under `dir` whose `dir`-relative path matches `pattern`.
    ///
    /// Split files and files in the protected tree are excluded.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConfigError`] for an invalid glob pattern.
    pub fn list_base_files_under(
        &self,
        dir: &Path,
        pattern: &str,
    ) -> Result<Vec<PathBuf>, ModelError> {
        let matcher = Pattern::new(pattern).map_err(|e| ModelError::ConfigError {
            message: format!("Invalid glob pattern '{pattern}': {e}"),
        })?;

        let matches: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|path| !is_split_file(path) && !is_protected(&self.root, path))
            .filter(|path| {
                path.strip_prefix(dir)
                    .map(|relative| matcher.matches_with(&slash_path(relative), MATCH_OPTIONS))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        debug!(
            target: "model::fileset",
            "Found {} base files for '{}' under {}",
            matches.len(),
            pattern,
            dir.display()
        );
        Ok(matches)
    }

    /// Companions of `base_path`: files named `<stem>.<token>.<ext>` anywhere under
    /// the root whose logical parent directory equals the base file's.
    pub fn list_split_files(&self, base_path: &Path) -> Vec<PathBuf> {
        let Some(pattern) = split_file_regex(base_path) else {
            return Vec::new();
        };
        let base_parent =
            logical_path(&self.root, base_path).and_then(|p| p.parent().map(Path::to_path_buf));

        self.files
            .iter()
            .filter(|path| {
                path.file_name()
                    .map(|name| pattern.is_match(&name.to_string_lossy()))
                    .unwrap_or(false)
            })
            .filter(|path| {
                logical_path(&self.root, path).and_then(|p| p.parent().map(Path::to_path_buf))
                    == base_parent
            })
            .cloned()
            .collect()
    }
}

/// True when the file name has a sub-extension (`Foo.bar.json`).
pub fn is_split_file(path: &Path) -> bool {
    path.file_stem().map(|stem| stem.to_string_lossy().contains('.')).unwrap_or(false)
}

/// True when `path` lies in the top-level `ProtectedModels` folder of `root`.
pub fn is_protected(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .ok()
        .and_then(|relative| relative.components().next())
        .map(|first| first.as_os_str().to_string_lossy().eq_ignore_ascii_case(PROTECTED_MODELS_DIR))
        .unwrap_or(false)
}

/// Root-relative path with a leading `ProtectedModels` segment removed.
pub fn logical_path(root: &Path, path: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(root).ok()?;
    if is_protected(root, path) {
        Some(relative.components().skip(1).collect())
    } else {
        Some(relative.to_path_buf())
    }
}

fn split_file_regex(base_path: &Path) -> Option<Regex> {
    let stem = base_path.file_stem()?.to_string_lossy().into_owned();
    let pattern = match base_path.extension() {
        Some(ext) => format!(
            r"^{}\.[^.]+\.{}$",
            regex::escape(&stem),
            regex::escape(&ext.to_string_lossy())
        ),
        None => format!(r"^{}\.[^.]+$", regex::escape(&stem)),
    };
    Regex::new(&pattern).ok()
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
