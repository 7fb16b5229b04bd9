//! Configuration management for the anime-shelf project.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use crate::paths::DataPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Persisted state storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Anime catalog (Jikan) settings
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::File => write!(f, "file"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend used for the durable records
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database file (sqlite) or directory (file), relative to the data
    /// directory or absolute. Defaults depend on the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Catalog lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Jikan API base URL
    pub base_url: String,

    /// Rate limiting settings
    pub rate_limit: RateLimitConfig,

    /// Maximum retries for failed requests
    pub max_retries: u32,

    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: f64,

    /// Maximum requests per minute
    pub requests_per_minute: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jikan.moe/v4".to_string(),
            rate_limit: RateLimitConfig {
                requests_per_second: 2.0,
                requests_per_minute: 50,
            },
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_seconds: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            storage: StorageConfig::default(),
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: false,
                file: true,
                json_format: false,
            },
            catalog: CatalogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the path of the durable state for the configured backend
    pub fn storage_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(path) => self.resolve(path),
            None => {
                let paths = DataPaths::new(self.data_dir());
                match self.storage.backend {
                    StorageBackend::File => paths.state_dir(),
                    StorageBackend::Sqlite | StorageBackend::Memory => paths.state_db(),
                }
            }
        }
    }

    /// Get the path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.log_dir)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.root_dir, "data");
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, None);
        assert_eq!(config.catalog.rate_limit.requests_per_second, 2.0);
        assert_eq!(config.catalog.base_url, "https://api.jikan.moe/v4");
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let mut original_config = Config::default();
        original_config.storage.backend = StorageBackend::File;
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.data.root_dir, original_config.data.root_dir);
        assert_eq!(loaded_config.storage.backend, StorageBackend::File);
        assert_eq!(
            loaded_config.catalog.base_url,
            original_config.catalog.base_url
        );

        Ok(())
    }

    #[test]
    fn test_partial_config_uses_section_defaults() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
            [data]
            root_dir = "/srv/shelf"

            [logging]
            log_dir = "logs"
            default_level = "debug"
            console = true
            file = false
            json_format = false
            "#,
        )?;

        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.catalog.max_retries, 3);
        assert_eq!(config.storage_path(), PathBuf::from("/srv/shelf/state.db"));

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() -> Result<()> {
        let config = Config::from_file("nonexistent.toml")?;
        // Should return default config without error
        assert_eq!(config.data.root_dir, "data");
        Ok(())
    }

    #[test]
    fn test_path_resolution() {
        let mut config = Config::default();

        assert!(config.storage_path().ends_with("data/state.db"));
        assert!(config.log_dir().ends_with("data/logs"));

        config.storage.backend = StorageBackend::File;
        assert!(config.storage_path().ends_with("data/state"));

        config.storage.path = Some("/var/lib/shelf".to_string());
        assert_eq!(config.storage_path(), PathBuf::from("/var/lib/shelf"));
    }
}
