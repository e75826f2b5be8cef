//! File-based tenant settings storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tokio::sync::Mutex;

use crate::domain::{TenantProfile, TenantSettings};
use crate::error::{StorageError, StorageResult};
use crate::storage::file::encode_name;
use crate::storage::traits::SettingsStorage;

/// File-based settings storage implementation.
pub struct FileSettingsStorage {
    /// Directory holding one JSON file per tenant.
    tenants_dir: PathBuf,
    /// Path of the global settings file.
    global_path: PathBuf,
    /// Mutex for coordinating file operations within this process.
    lock: Mutex<()>,
}

impl FileSettingsStorage {
    /// Create a new file settings storage rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: &Path) -> Self {
        Self {
            tenants_dir: base_dir.join("tenants"),
            global_path: base_dir.join("global.json"),
            lock: Mutex::new(()),
        }
    }

    /// Get the file path for a tenant.
    fn tenant_path(&self, id: &str) -> PathBuf {
        self.tenants_dir.join(format!("{}.json", encode_name(id)))
    }

    fn save_json<T: serde::Serialize>(path: &Path, value: &T) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        file.lock_exclusive()
            .map_err(|e| StorageError::LockFailed(e.to_string()))?;

        serde_json::to_writer_pretty(&file, value)?;
        file.sync_all()?;
        FileExt::unlock(&file).map_err(|e| StorageError::LockFailed(e.to_string()))?;

        Ok(())
    }

    fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }

        let file = std::fs::File::open(path)?;
        FileExt::lock_shared(&file).map_err(|e| StorageError::LockFailed(e.to_string()))?;

        let value: T = serde_json::from_reader(&file)?;
        FileExt::unlock(&file).map_err(|e| StorageError::LockFailed(e.to_string()))?;

        Ok(Some(value))
    }
}

#[async_trait]
impl SettingsStorage for FileSettingsStorage {
    async fn get_tenant(&self, id: &str) -> StorageResult<Option<TenantProfile>> {
        let _guard = self.lock.lock().await;
        Self::load_json(&self.tenant_path(id))
    }

    async fn save_tenant(&self, profile: &TenantProfile) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        Self::save_json(&self.tenant_path(&profile.id), profile)
    }

    async fn list_tenants(&self) -> StorageResult<Vec<TenantProfile>> {
        let _guard = self.lock.lock().await;

        if !self.tenants_dir.exists() {
            return Ok(Vec::new());
        }

        let mut profiles = Vec::new();

        for entry in std::fs::read_dir(&self.tenants_dir)? {
            let path = entry?.path();

            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match Self::load_json::<TenantProfile>(&path) {
                Ok(Some(profile)) => profiles.push(profile),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "Failed to parse tenant file");
                }
            }
        }

        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(profiles)
    }

    async fn delete_tenant(&self, id: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock().await;

        match std::fs::remove_file(self.tenant_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_global_settings(&self) -> StorageResult<Option<TenantSettings>> {
        let _guard = self.lock.lock().await;
        Self::load_json(&self.global_path)
    }

    async fn save_global_settings(&self, settings: &TenantSettings) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        Self::save_json(&self.global_path, settings)
    }
}
