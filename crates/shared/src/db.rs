//! Database operations for SQLite.
//!
//! This module handles the connection, schema creation, and migrations for the
//! key-value table backing [`crate::SqliteStorage`].

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Current schema version stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let is_new = !path.exists();

        debug!(path = %path.display(), "Opening database");

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        Self::init(conn, is_new)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn, true)
    }

    fn init(conn: Connection, is_new: bool) -> Result<Self> {
        let mut db = Self { conn };

        if is_new {
            info!("Creating new database schema");
            db.create_schema()?;
        } else {
            debug!("Database already exists");
            db.run_migrations()?;
        }

        Ok(db)
    }

    /// Create the database schema
    fn create_schema(&mut self) -> Result<()> {
        self.conn
            .execute_batch(include_str!("../schema.sql"))
            .context("Failed to create database schema")?;

        info!("Database schema created successfully");
        Ok(())
    }

    /// Get a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Check if a table exists
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get the database version (from user_version pragma)
    pub fn get_version(&self) -> Result<i32> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    /// Set the database version
    pub fn set_version(&self, version: i32) -> Result<()> {
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {}", version))?;
        Ok(())
    }

    /// Run migrations for existing databases
    fn run_migrations(&mut self) -> Result<()> {
        // Files created by an older build, or emptied externally
        if !self.table_exists("kv_store")? {
            info!("Running migration: Creating kv_store table");
            self.create_schema()?;
            return Ok(());
        }

        if self.get_version()? < SCHEMA_VERSION {
            info!(
                from = self.get_version()?,
                to = SCHEMA_VERSION,
                "Running migration: stamping schema version"
            );
            self.set_version(SCHEMA_VERSION)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_database() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("nested").join("state.db");

        let db = Database::open(&db_path)?;
        assert!(db_path.exists());
        assert!(db.table_exists("kv_store")?);
        assert_eq!(db.get_version()?, SCHEMA_VERSION);

        Ok(())
    }

    #[test]
    fn test_migrates_empty_existing_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("state.db");

        // An existing database without our table
        Connection::open(&db_path)?.execute_batch("CREATE TABLE other (id INTEGER)")?;

        let db = Database::open(&db_path)?;
        assert!(db.table_exists("kv_store")?);
        assert!(db.table_exists("other")?);

        Ok(())
    }

    #[test]
    fn test_version() -> Result<()> {
        let db = Database::open_in_memory()?;

        db.set_version(7)?;
        assert_eq!(db.get_version()?, 7);

        Ok(())
    }
}
