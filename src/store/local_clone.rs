use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::ModelError;
use crate::utils::remove_dir_all;

/// The on-disk clone of the model repository.
///
/// A model root with no namespaces at all is treated as corrupt local state, and
/// the store asks the clone to wipe itself so the next sync starts fresh.
pub trait LocalClone: Send + Sync + fmt::Debug {
    /// Remove the local clone.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FileAccess`] when the clone cannot be removed.
    fn wipe(&self) -> Result<(), ModelError>;
}

/// A local clone living in a directory.
#[derive(Debug, Clone)]
pub struct LocalCloneDir {
    path: PathBuf,
}

impl LocalCloneDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalClone for LocalCloneDir {
    fn wipe(&self) -> Result<(), ModelError> {
        warn!(target: "model::store", "Removing local clone at {}", self.path.display());
        remove_dir_all(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_wipe_removes_directory() {
        let temp = TempDir::new().unwrap();
        let clone = temp.path().join("models");
        std::fs::create_dir_all(clone.join(".git")).unwrap();

        LocalCloneDir::new(&clone).wipe().unwrap();
        assert!(!clone.exists());

        // Wiping twice is fine
        LocalCloneDir::new(&clone).wipe().unwrap();
    }
}
