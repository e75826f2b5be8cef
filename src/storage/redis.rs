//! Redis storage backend.
//!
//! Shares counters, locks and tenant settings between any number of workers.
//!
//! Key layout (with the default `schoolid` prefix):
//! ```text
//! schoolid:id_counter:{id_type}:{tenant}:{year}        counter value (PX ttl)
//! schoolid:id_counter:{id_type}:{tenant}:{year}:lock   lock token (NX PX ttl)
//! schoolid:tenants                                     hash of tenant JSON
//! schoolid:settings:__global__                         global settings JSON
//! ```

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis;
use deadpool_redis::{Config as RedisPoolConfig, Connection, Pool, PoolConfig, Runtime};
use uuid::Uuid;

use crate::config::RedisStorageConfig;
use crate::domain::{GLOBAL_SETTINGS_KEY, TenantProfile, TenantSettings};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::{CacheStorage, DistributedLock, LockGuard, SettingsStorage, Storage};

/// Deletes the lock only if it still carries the caller's token.
const RELEASE_LOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Redis storage implementation.
pub struct RedisStorage {
    pool: Pool,
    prefix: String,
}

impl RedisStorage {
    /// Create a pool for the first configured URL.
    ///
    /// No connection is opened until the first command.
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured or the pool cannot be built.
    pub fn new(config: &RedisStorageConfig) -> StorageResult<Self> {
        let url = config
            .urls
            .first()
            .ok_or_else(|| StorageError::Connection("no redis url configured".to_string()))?;

        let mut pool_config = RedisPoolConfig::from_url(url.clone());
        pool_config.pool = Some(PoolConfig::new(config.pool_size));

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    fn tenants_key(&self) -> String {
        self.key("tenants")
    }

    fn global_key(&self) -> String {
        self.key(&format!("settings:{GLOBAL_SETTINGS_KEY}"))
    }

    async fn connection(&self) -> StorageResult<Connection> {
        Ok(self.pool.get().await?)
    }
}

/// `EVAL` of the compare-and-delete script for one lock.
fn release_command(lock_key: &str, token: &str) -> redis::Cmd {
    let mut cmd = redis::cmd("EVAL");
    cmd.arg(RELEASE_LOCK_SCRIPT).arg(1).arg(lock_key).arg(token);
    cmd
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheStorage for RedisStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<u64>> {
        let mut conn = self.connection().await?;
        let value: Option<u64> = redis::cmd("GET")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: u64, ttl: Duration) -> StorageResult<()> {
        let mut conn = self.connection().await?;
        let (): () = redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn forget(&self, key: &str) -> StorageResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("DEL")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl DistributedLock for RedisStorage {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> StorageResult<Option<LockGuard>> {
        let lock_key = self.key(key);
        let token = Uuid::new_v4().to_string();

        let mut conn = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(&lock_key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;

        if reply.is_none() {
            return Ok(None);
        }

        let pool = self.pool.clone();

        Ok(Some(LockGuard::new(key.to_string(), move || async move {
            let released = async {
                let mut conn = pool.get().await?;
                let _: i64 = release_command(&lock_key, &token)
                    .query_async(&mut conn)
                    .await?;
                Ok::<(), StorageError>(())
            }
            .await;

            if let Err(e) = released {
                // The lock still expires after its TTL
                tracing::warn!(key = %lock_key, error = %e, "Failed to release redis lock");
            }
        })))
    }
}

#[async_trait]
impl SettingsStorage for RedisStorage {
    async fn get_tenant(&self, id: &str) -> StorageResult<Option<TenantProfile>> {
        let mut conn = self.connection().await?;
        let json: Option<String> = redis::cmd("HGET")
            .arg(self.tenants_key())
            .arg(id)
            .query_async(&mut conn)
            .await?;

        json.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn save_tenant(&self, profile: &TenantProfile) -> StorageResult<()> {
        let json = serde_json::to_string(profile)?;
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("HSET")
            .arg(self.tenants_key())
            .arg(&profile.id)
            .arg(json)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_tenants(&self) -> StorageResult<Vec<TenantProfile>> {
        let mut conn = self.connection().await?;
        let values: Vec<String> = redis::cmd("HVALS")
            .arg(self.tenants_key())
            .query_async(&mut conn)
            .await?;

        let mut profiles = Vec::with_capacity(values.len());
        for json in values {
            match serde_json::from_str::<TenantProfile>(&json) {
                Ok(profile) => profiles.push(profile),
                Err(e) => tracing::warn!(error = %e, "Failed to parse tenant entry"),
            }
        }

        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(profiles)
    }

    async fn delete_tenant(&self, id: &str) -> StorageResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("HDEL")
            .arg(self.tenants_key())
            .arg(id)
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn get_global_settings(&self) -> StorageResult<Option<TenantSettings>> {
        let mut conn = self.connection().await?;
        let json: Option<String> = redis::cmd("GET")
            .arg(self.global_key())
            .query_async(&mut conn)
            .await?;

        json.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn save_global_settings(&self, settings: &TenantSettings) -> StorageResult<()> {
        let json = serde_json::to_string(settings)?;
        let mut conn = self.connection().await?;
        let (): () = redis::cmd("SET")
            .arg(self.global_key())
            .arg(json)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn health_check(&self) -> StorageResult<()> {
        let mut conn = self
            .connection()
            .await
            .map_err(|_| StorageError::Unavailable)?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;

        if pong == "PONG" {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
