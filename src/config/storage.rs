//! Storage configuration.

use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process storage (tests/single instance).
    #[default]
    Memory,
    /// File-based storage (single-node).
    File,
    /// Redis storage (shared between workers).
    Redis,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::File => write!(f, "file"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type.
    #[serde(default)]
    pub backend: StorageBackend,

    /// File storage configuration.
    #[serde(default)]
    pub file: FileStorageConfig,

    /// Redis storage configuration.
    #[serde(default)]
    pub redis: RedisStorageConfig,
}

impl StorageConfig {
    /// Validate the storage configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration fields are missing for the selected backend.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            StorageBackend::Memory => Ok(()),
            StorageBackend::File => {
                if self.file.data_dir.as_os_str().is_empty() {
                    return Err(ConfigError::Message(
                        "storage.file.data_dir cannot be empty".to_string(),
                    ));
                }
                Ok(())
            }
            StorageBackend::Redis => {
                if self.redis.urls.is_empty() {
                    return Err(ConfigError::Message(
                        "storage.redis.urls cannot be empty".to_string(),
                    ));
                }
                if self.redis.key_prefix.is_empty() {
                    return Err(ConfigError::Message(
                        "storage.redis.key_prefix cannot be empty".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FileStorageConfig {
    /// Directory for storing data files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Redis storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisStorageConfig {
    /// Redis URL(s). Only the first is used for the connection pool.
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Prefix applied to every key written by this service.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_redis_urls() -> Vec<String> {
    vec!["redis://127.0.0.1:6379".to_string()]
}

const fn default_pool_size() -> usize {
    10
}

fn default_key_prefix() -> String {
    "schoolid".to_string()
}

impl Default for RedisStorageConfig {
    fn default() -> Self {
        Self {
            urls: default_redis_urls(),
            pool_size: default_pool_size(),
            key_prefix: default_key_prefix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_display() {
        assert_eq!(StorageBackend::Memory.to_string(), "memory");
        assert_eq!(StorageBackend::File.to_string(), "file");
        assert_eq!(StorageBackend::Redis.to_string(), "redis");
    }

    #[test]
    fn test_storage_config_validation() {
        let config = StorageConfig::default();
        assert!(config.validate().is_ok());

        let mut config = StorageConfig::default();
        config.backend = StorageBackend::Redis;
        config.redis.urls = vec![];
        assert!(config.validate().is_err());

        let mut config = StorageConfig::default();
        config.backend = StorageBackend::File;
        config.file.data_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
