//! Path helpers.
//!
//! Explorer paths and resource relative paths use `\` as separator regardless of
//! platform, since they come from model JSON rather than the filesystem. Input
//! is tolerant of `/` as well.

use std::path::Path;

use crate::constants::TREE_PATH_SEPARATOR;
use crate::core::{FileOperation, FileOperationError, FileResultExt};

/// Split a `\`- or `/`-separated path into its non-empty segments.
pub fn split_tree_path(path: &str) -> Vec<&str> {
    path.split(['\\', '/']).filter(|segment| !segment.is_empty()).collect()
}

/// Join two explorer paths; an empty parent yields `child` unchanged.
pub fn join_tree_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        format!("{parent}{TREE_PATH_SEPARATOR}{child}")
    }
}

/// Remove a directory tree; a missing directory is not an error.
///
/// # Errors
///
/// Returns a [`FileOperationError`] when the removal fails.
pub fn remove_dir_all(path: &Path) -> Result<(), FileOperationError> {
    if path.exists() {
        std::fs::remove_dir_all(path).with_file_context(
            FileOperation::Remove,
            path,
            "removing directory tree",
            "utils::paths::remove_dir_all",
        )?;
    }
    Ok(())
}
