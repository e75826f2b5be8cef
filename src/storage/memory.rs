//! In-process storage backend.
//!
//! Counters, locks and tenant settings live in process memory. Locks only
//! coordinate tasks within this process, so the backend suits tests and
//! single-instance deployments.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::{TenantProfile, TenantSettings};
use crate::error::StorageResult;
use crate::storage::traits::{CacheStorage, DistributedLock, LockGuard, SettingsStorage, Storage};

/// A cached value and its expiry (`None` = never).
struct CachedValue {
    value: u64,
    expires_at: Option<Instant>,
}

impl CachedValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// A held lock, identified by the token of its owner.
struct HeldLock {
    token: Uuid,
    expires_at: Option<Instant>,
}

/// In-memory storage implementation.
#[derive(Default)]
pub struct MemoryStorage {
    values: DashMap<String, CachedValue>,
    locks: Arc<DashMap<String, HeldLock>>,
    tenants: RwLock<BTreeMap<String, TenantProfile>>,
    global: RwLock<Option<TenantSettings>>,
}

impl MemoryStorage {
    /// Create an empty memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<u64>> {
        let now = Instant::now();
        // Copy out before touching the map again; a live Ref would deadlock remove_if
        let cached = self
            .values
            .get(key)
            .map(|entry| (entry.value, entry.is_live(now)));

        match cached {
            Some((value, true)) => Ok(Some(value)),
            Some((_, false)) => {
                self.values.remove_if(key, |_, entry| !entry.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: u64, ttl: Duration) -> StorageResult<()> {
        self.values.insert(
            key.to_string(),
            CachedValue {
                value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
        Ok(())
    }

    async fn forget(&self, key: &str) -> StorageResult<bool> {
        Ok(self.values.remove(key).is_some())
    }
}

#[async_trait]
impl DistributedLock for MemoryStorage {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> StorageResult<Option<LockGuard>> {
        let now = Instant::now();
        let token = Uuid::new_v4();
        let held = HeldLock {
            token,
            expires_at: now.checked_add(ttl),
        };

        let acquired = match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().expires_at.is_some_and(|at| at <= now) {
                    entry.insert(held);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(held);
                true
            }
        };

        if !acquired {
            return Ok(None);
        }

        let locks = Arc::clone(&self.locks);
        let key_for_release = key.to_string();

        Ok(Some(LockGuard::new(key.to_string(), move || async move {
            // An expired lock may already belong to someone else
            locks.remove_if(&key_for_release, |_, held| held.token == token);
        })))
    }
}

#[async_trait]
impl SettingsStorage for MemoryStorage {
    async fn get_tenant(&self, id: &str) -> StorageResult<Option<TenantProfile>> {
        Ok(self.tenants.read().get(id).cloned())
    }

    async fn save_tenant(&self, profile: &TenantProfile) -> StorageResult<()> {
        self.tenants
            .write()
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn list_tenants(&self) -> StorageResult<Vec<TenantProfile>> {
        Ok(self.tenants.read().values().cloned().collect())
    }

    async fn delete_tenant(&self, id: &str) -> StorageResult<bool> {
        Ok(self.tenants.write().remove(id).is_some())
    }

    async fn get_global_settings(&self) -> StorageResult<Option<TenantSettings>> {
        Ok(self.global.read().clone())
    }

    async fn save_global_settings(&self, settings: &TenantSettings) -> StorageResult<()> {
        *self.global.write() = Some(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
