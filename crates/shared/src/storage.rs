//! Durable key-value storage backends.
//!
//! [`KeyValueStorage`] is the only interface the store talks to. Values are
//! UTF-8 JSON text; backends do not interpret them.

use crate::config::{Config, StorageBackend};
use crate::db::Database;
use crate::error::StorageError;
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Synchronous string key-value storage
pub trait KeyValueStorage {
    /// Read the value under `key`, `None` when absent
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError>;

    /// Insert or replace the value under `key`
    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), StorageError>;

    /// Remove `key`; removing an absent key succeeds
    fn delete(&mut self, key: &str) -> std::result::Result<(), StorageError>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Box<S> {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &str) -> std::result::Result<(), StorageError> {
        (**self).delete(key)
    }
}

/// Open the backend selected in the configuration
pub fn open_storage(config: &Config) -> Result<Box<dyn KeyValueStorage>> {
    let path = config.storage_path();

    let storage: Box<dyn KeyValueStorage> = match config.storage.backend {
        StorageBackend::Sqlite => Box::new(
            SqliteStorage::open(&path)
                .with_context(|| format!("Failed to open SQLite storage at {}", path.display()))?,
        ),
        StorageBackend::File => Box::new(
            FileStorage::new(&path)
                .with_context(|| format!("Failed to open file storage at {}", path.display()))?,
        ),
        StorageBackend::Memory => Box::new(MemoryStorage::new()),
    };

    info!(
        backend = %config.storage.backend,
        path = %path.display(),
        "Storage opened"
    );

    Ok(storage)
}

// ========== In-memory ==========

/// Non-durable storage, used in tests and when durable storage is unavailable
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-populated with raw values
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> std::result::Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ========== SQLite ==========

/// Storage backed by the `kv_store` table
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    /// Open or create the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Wrap an already opened database
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        let value = self
            .db
            .conn()
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        self.db.conn().execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            params![key, value],
        )?;
        debug!(key = key, bytes = value.len(), "Stored record");
        Ok(())
    }

    fn delete(&mut self, key: &str) -> std::result::Result<(), StorageError> {
        let removed = self
            .db
            .conn()
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        debug!(key = key, removed = removed, "Deleted record");
        Ok(())
    }
}

// ========== JSON files ==========

/// Storage keeping one `<key>.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create the storage, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Get the file path for a given key
    fn record_path(&self, key: &str) -> PathBuf {
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|', '.'], "_");
        self.dir.join(format!("{}.json", safe_key))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        let path = self.record_path(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        let path = self.record_path(key);
        let tmp = path.with_extension("json.tmp");

        // Replace via rename so a crash never leaves a half-written record
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;

        debug!(key = key, path = %path.display(), "Stored record");
        Ok(())
    }

    fn delete(&mut self, key: &str) -> std::result::Result<(), StorageError> {
        match std::fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(storage: &mut dyn KeyValueStorage) -> Result<()> {
        assert_eq!(storage.get("myList")?, None);

        storage.set("myList", "[]")?;
        assert_eq!(storage.get("myList")?.as_deref(), Some("[]"));

        storage.set("myList", r#"[{"animeId":1}]"#)?;
        assert_eq!(storage.get("myList")?.as_deref(), Some(r#"[{"animeId":1}]"#));

        storage.delete("myList")?;
        assert_eq!(storage.get("myList")?, None);

        // Deleting again is not an error
        storage.delete("myList")?;

        Ok(())
    }

    #[test]
    fn test_memory_storage() -> Result<()> {
        exercise(&mut MemoryStorage::new())
    }

    #[test]
    fn test_memory_storage_seeded() -> Result<()> {
        let storage = MemoryStorage::with_entries([("watchHistory", "not json")]);
        assert_eq!(storage.get("watchHistory")?.as_deref(), Some("not json"));
        Ok(())
    }

    #[test]
    fn test_sqlite_storage() -> Result<()> {
        exercise(&mut SqliteStorage::new(Database::open_in_memory()?))
    }

    #[test]
    fn test_sqlite_storage_persists_across_reopen() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("state.db");

        {
            let mut storage = SqliteStorage::open(&db_path)?;
            storage.set("watchHistory", "[]")?;
        }

        let storage = SqliteStorage::open(&db_path)?;
        assert_eq!(storage.get("watchHistory")?.as_deref(), Some("[]"));

        Ok(())
    }

    #[test]
    fn test_file_storage() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut storage = FileStorage::new(temp_dir.path().join("state"))?;

        exercise(&mut storage)?;

        storage.set("watchHistory", "[]")?;
        assert!(temp_dir.path().join("state").join("watchHistory.json").exists());

        Ok(())
    }

    #[test]
    fn test_file_storage_sanitizes_keys() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let storage = FileStorage::new(temp_dir.path())?;

        assert_eq!(
            storage.record_path("../escape"),
            temp_dir.path().join("___escape.json")
        );

        Ok(())
    }

    #[test]
    fn test_open_storage_from_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut config = Config::default();
        config.data.root_dir = temp_dir.path().to_string_lossy().to_string();

        let mut storage = open_storage(&config)?;
        storage.set("myList", "[]")?;
        assert!(temp_dir.path().join("state.db").exists());

        config.storage.backend = StorageBackend::File;
        let mut storage = open_storage(&config)?;
        storage.set("myList", "[]")?;
        assert!(temp_dir.path().join("state").join("myList.json").exists());

        Ok(())
    }
}
