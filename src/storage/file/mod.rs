//! File-based storage backend.
//!
//! This backend stores data as JSON files with file locking for atomic operations.
//! Suitable for development and single-node deployments.
//!
//! Directory structure:
//! ```text
//! data/
//! ├── counters/
//! │   └── {key}.json
//! ├── tenants/
//! │   └── {id}.json
//! ├── global.json
//! └── locks/
//!     └── {key}.lock
//! ```

mod counter;
mod lock;
mod settings;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::FileStorageConfig;
use crate::domain::{TenantProfile, TenantSettings};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::{CacheStorage, DistributedLock, LockGuard, SettingsStorage, Storage};

pub use counter::FileCounterStorage;
pub use lock::FileLock;
pub use settings::FileSettingsStorage;

/// File-based storage implementation.
pub struct FileStorage {
    /// Base data directory.
    base_dir: PathBuf,
    /// Counter cache.
    counter_storage: FileCounterStorage,
    /// Tenant settings.
    settings_storage: FileSettingsStorage,
    /// Lock manager.
    lock_manager: FileLock,
}

impl FileStorage {
    /// Create a new file storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directories cannot be created.
    pub fn new(config: &FileStorageConfig) -> StorageResult<Self> {
        let base_dir = config.data_dir.clone();

        Self::ensure_directories(&base_dir)?;

        Ok(Self {
            counter_storage: FileCounterStorage::new(base_dir.join("counters")),
            settings_storage: FileSettingsStorage::new(&base_dir),
            lock_manager: FileLock::new(base_dir.join("locks")),
            base_dir,
        })
    }

    /// Ensure all required directories exist.
    fn ensure_directories(base_dir: &Path) -> StorageResult<()> {
        let dirs = [
            base_dir.to_path_buf(),
            base_dir.join("counters"),
            base_dir.join("tenants"),
            base_dir.join("locks"),
        ];

        for dir in &dirs {
            std::fs::create_dir_all(dir).map_err(|e| {
                StorageError::FileIO(format!("Failed to create directory {}: {e}", dir.display()))
            })?;
        }

        Ok(())
    }
}

/// Longest encoded key used verbatim as a file name stem.
const MAX_ENCODED_NAME: usize = 200;

/// Encode a key as a file name.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`, so distinct keys always map to distinct names. Encodings longer than
/// [`MAX_ENCODED_NAME`] are replaced by `~` and a name-based UUID of the key,
/// which keeps every file name under the 255-byte limit. `~` itself is always
/// escaped, so hashed names never meet verbatim ones.
pub(crate) fn encode_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }

    if encoded.len() <= MAX_ENCODED_NAME {
        encoded
    } else {
        format!("~{}", Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).simple())
    }
}

#[async_trait]
impl CacheStorage for FileStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<u64>> {
        self.counter_storage.get(key).await
    }

    async fn put(&self, key: &str, value: u64, ttl: Duration) -> StorageResult<()> {
        self.counter_storage.put(key, value, ttl).await
    }

    async fn forget(&self, key: &str) -> StorageResult<bool> {
        self.counter_storage.forget(key).await
    }
}

#[async_trait]
impl SettingsStorage for FileStorage {
    async fn get_tenant(&self, id: &str) -> StorageResult<Option<TenantProfile>> {
        self.settings_storage.get_tenant(id).await
    }

    async fn save_tenant(&self, profile: &TenantProfile) -> StorageResult<()> {
        self.settings_storage.save_tenant(profile).await
    }

    async fn list_tenants(&self) -> StorageResult<Vec<TenantProfile>> {
        self.settings_storage.list_tenants().await
    }

    async fn delete_tenant(&self, id: &str) -> StorageResult<bool> {
        self.settings_storage.delete_tenant(id).await
    }

    async fn get_global_settings(&self) -> StorageResult<Option<TenantSettings>> {
        self.settings_storage.get_global_settings().await
    }

    async fn save_global_settings(&self, settings: &TenantSettings) -> StorageResult<()> {
        self.settings_storage.save_global_settings(settings).await
    }
}

#[async_trait]
impl DistributedLock for FileStorage {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> StorageResult<Option<LockGuard>> {
        self.lock_manager.try_acquire(key, ttl).await
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn health_check(&self) -> StorageResult<()> {
        if !self.base_dir.exists() {
            return Err(StorageError::Unavailable);
        }

        let test_file = self.base_dir.join(".health_check");
        tokio::fs::write(&test_file, b"ok")
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check failed: {e}")))?;
        tokio::fs::remove_file(&test_file)
            .await
            .map_err(|e| StorageError::FileIO(format!("Health check cleanup failed: {e}")))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
