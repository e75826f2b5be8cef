//! Sequence counter service.
//!
//! Each `(id_type, tenant, year)` has its own counter in the cache storage.
//! Every read-modify-write happens under the counter's distributed lock, so
//! concurrent callers on any number of workers receive distinct consecutive
//! values.

use std::sync::Arc;

use crate::config::CounterConfig;
use crate::domain::CounterKey;
use crate::error::{AppError, Result};
use crate::storage::traits::{LockGuard, Storage};

/// Lock-guarded counter operations.
pub struct SequenceCounter {
    /// Storage backend.
    storage: Arc<dyn Storage>,
    /// Lock and retention settings.
    config: CounterConfig,
}

impl SequenceCounter {
    /// Create a new sequence counter.
    pub fn new(storage: Arc<dyn Storage>, config: &CounterConfig) -> Self {
        Self {
            storage,
            config: config.clone(),
        }
    }

    /// Reserve the next value for `key`. The first value of a sequence is 1.
    ///
    /// The value is consumed even if the caller later fails to use it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LockTimeout` if the lock cannot be acquired within the
    /// configured wait, or a storage error.
    pub async fn next_value(&self, key: &CounterKey) -> Result<u64> {
        let guard = self.lock(key).await?;
        let result = self.increment(key).await;
        guard.release().await;
        result
    }

    /// Delete the counter so the next value is 1 again.
    ///
    /// Returns whether a counter existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or storage fails.
    pub async fn reset(&self, key: &CounterKey) -> Result<bool> {
        let guard = self.lock(key).await?;
        let result = self.storage.forget(&key.cache_key()).await;
        guard.release().await;

        let existed = result?;
        tracing::warn!(key = %key, existed, "Counter reset");
        metrics::counter!("schoolid_counter_resets_total").increment(1);
        Ok(existed)
    }

    /// Last value handed out for `key`, or 0 if the sequence has not started.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired or storage fails.
    pub async fn current(&self, key: &CounterKey) -> Result<u64> {
        let guard = self.lock(key).await?;
        let result = self.storage.get(&key.cache_key()).await;
        guard.release().await;

        Ok(result?.unwrap_or(0))
    }

    async fn lock(&self, key: &CounterKey) -> Result<LockGuard> {
        self.storage
            .acquire(
                &key.lock_key(),
                self.config.lock_ttl(),
                self.config.lock_wait(),
                self.config.lock_retry(),
            )
            .await
            .map_err(AppError::from_storage)
    }

    async fn increment(&self, key: &CounterKey) -> Result<u64> {
        let cache_key = key.cache_key();
        let current = self.storage.get(&cache_key).await?.unwrap_or(0);
        let next = current
            .checked_add(1)
            .ok_or_else(|| AppError::Internal(format!("counter {cache_key} overflowed")))?;

        self.storage
            .put(&cache_key, next, self.config.counter_ttl())
            .await?;

        tracing::trace!(key = %cache_key, value = next, "Counter incremented");
        Ok(next)
    }
}
