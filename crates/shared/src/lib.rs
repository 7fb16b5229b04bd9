//! Shared library for the anime-shelf project.
//!
//! This crate provides the persisted per-user state and the plumbing around it:
//! - Watch history and saved-list models
//! - The `PersistedStateStore` and its storage backends
//! - Configuration management
//! - File path utilities
//! - Logging infrastructure

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod paths;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::StorageError;
pub use logging::LogConfig;
pub use models::*;
pub use paths::DataPaths;
pub use storage::{open_storage, FileStorage, KeyValueStorage, MemoryStorage, SqliteStorage};
pub use store::{Clock, PersistedStateStore, SystemClock, WATCH_HISTORY_LIMIT};

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
