//! Storage error taxonomy.
//!
//! These errors never reach callers of [`crate::PersistedStateStore`]; the
//! store logs them and degrades to empty reads or skipped writes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage disabled, quota exceeded, access denied or backend failure
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Stored value is not a JSON array of the expected shape
    #[error("corrupt record under key '{key}': {source}")]
    CorruptRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Collection could not be encoded before writing
    #[error("failed to serialize record '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}
