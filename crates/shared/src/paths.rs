//! File path utilities for organizing data files.
//!
//! Default locations of the persisted state inside the data directory. The
//! storage backends create their own parent directories on open.

use std::path::{Path, PathBuf};

/// File path manager for data files
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Create a new DataPaths with the given root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the SQLite database holding the state records
    pub fn state_db(&self) -> PathBuf {
        self.root.join("state.db")
    }

    /// Get the directory holding one JSON file per state record
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let paths = DataPaths::new("/data");

        assert_eq!(paths.state_db(), PathBuf::from("/data/state.db"));
        assert_eq!(paths.state_dir(), PathBuf::from("/data/state"));
    }
}
