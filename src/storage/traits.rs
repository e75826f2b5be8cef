//! Storage trait definitions.
//!
//! These traits define the collaborators the ID generator depends on: a cache
//! holding counter values, a distributed lock guarding them, and the settings
//! store owning tenant formats. Backends implement all three.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};

use crate::domain::{TenantProfile, TenantSettings};
use crate::error::{StorageError, StorageResult};

/// Counter value cache.
///
/// Read-modify-write sequences must be guarded by a [`DistributedLock`];
/// these operations are individually atomic only.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Read a value. Expired or missing keys read as `None`.
    async fn get(&self, key: &str) -> StorageResult<Option<u64>>;

    /// Store a value that expires after `ttl`.
    async fn put(&self, key: &str, value: u64, ttl: Duration) -> StorageResult<()>;

    /// Delete a value. Returns whether it existed.
    async fn forget(&self, key: &str) -> StorageResult<bool>;
}

/// Tenant settings storage.
#[async_trait]
pub trait SettingsStorage: Send + Sync {
    /// Get a tenant profile by ID.
    async fn get_tenant(&self, id: &str) -> StorageResult<Option<TenantProfile>>;

    /// Create or replace a tenant profile.
    async fn save_tenant(&self, profile: &TenantProfile) -> StorageResult<()>;

    /// List all tenant profiles.
    async fn list_tenants(&self) -> StorageResult<Vec<TenantProfile>>;

    /// Delete a tenant profile.
    async fn delete_tenant(&self, id: &str) -> StorageResult<bool>;

    /// Settings used when no tenant is given.
    async fn get_global_settings(&self) -> StorageResult<Option<TenantSettings>>;

    /// Replace the global settings.
    async fn save_global_settings(&self, settings: &TenantSettings) -> StorageResult<()>;
}

/// Distributed lock operations.
///
/// Provides distributed locking for coordination across multiple workers.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Try to acquire a lock without waiting.
    ///
    /// Returns `None` if the lock is already held.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> StorageResult<Option<LockGuard>>;

    /// Acquire a lock, blocking for at most `wait`.
    ///
    /// # Arguments
    ///
    /// * `key` - Lock key/name
    /// * `ttl` - Time-to-live for the lock (auto-release after this duration)
    /// * `wait` - Longest time to keep retrying
    /// * `retry` - Delay between attempts
    ///
    /// # Errors
    ///
    /// Returns `StorageError::LockTimeout` if the lock is still held when `wait` elapses.
    async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        wait: Duration,
        retry: Duration,
    ) -> StorageResult<LockGuard> {
        let deadline = Instant::now() + wait;

        loop {
            if let Some(guard) = self.try_acquire(key, ttl).await? {
                return Ok(guard);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(StorageError::LockTimeout(format!(
                    "lock '{key}' not acquired within {}ms",
                    wait.as_millis()
                )));
            }

            sleep(retry.min(deadline - now)).await;
        }
    }
}

type ReleaseFn = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// RAII guard for distributed locks.
///
/// The lock is released when the guard is dropped; prefer [`LockGuard::release`]
/// so the release completes before the caller continues.
pub struct LockGuard {
    key: String,
    release_fn: Option<ReleaseFn>,
}

impl LockGuard {
    /// Create a new lock guard.
    pub fn new<F, Fut>(key: String, release_fn: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            key,
            release_fn: Some(Box::new(move || Box::pin(release_fn()))),
        }
    }

    /// Get the lock key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock and wait for the release to finish.
    pub async fn release(mut self) {
        if let Some(release_fn) = self.release_fn.take() {
            release_fn().await;
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(release_fn) = self.release_fn.take() {
            // Without a runtime the lock is left to expire via its TTL
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    release_fn().await;
                });
            } else {
                tracing::warn!(key = %self.key, "Lock dropped outside a runtime");
            }
        }
    }
}

/// Combined storage trait for all storage operations.
#[async_trait]
pub trait Storage: CacheStorage + SettingsStorage + DistributedLock {
    /// Check if the storage backend is healthy and reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Get the storage backend name.
    fn backend_name(&self) -> &'static str;
}
