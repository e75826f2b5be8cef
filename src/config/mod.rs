//! Configuration management module.
//!
//! Supports loading configuration from:
//! - A `.env` file in the working directory
//! - TOML files (config/default.toml, config/{profile}.toml)
//! - Environment variables with `SCHOOLID__<SECTION>__<KEY>` pattern

mod server;
mod storage;

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use server::ServerConfig;
pub use storage::{FileStorageConfig, RedisStorageConfig, StorageBackend, StorageConfig};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Counter locking and retention.
    #[serde(default)]
    pub counter: CounterConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. `config/default.toml`
    /// 2. `config/{SCHOOLID_PROFILE}.toml` (if `SCHOOLID_PROFILE` is set)
    /// 3. Environment variables with `SCHOOLID__` prefix
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is not an error
        dotenvy::dotenv().ok();

        let profile =
            std::env::var("SCHOOLID_PROFILE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{profile}")).required(false))
            // SCHOOLID__COUNTER__LOCK_WAIT_MS=5000 -> counter.lock_wait_ms = 5000
            .add_source(
                Environment::with_prefix("SCHOOLID")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.api_tokens")
                    .with_list_parse_key("storage.redis.urls")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port cannot be 0".to_string()));
        }

        self.storage.validate()?;
        self.counter.validate()?;

        if self.auth.admin_token.is_empty() {
            return Err(ConfigError::Message(
                "auth.admin_token cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Counter lock and retention settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CounterConfig {
    /// Lifetime of a held counter lock before it expires on its own.
    #[serde(default = "default_lock_ttl_ms")]
    pub lock_ttl_ms: u64,

    /// Longest a caller blocks waiting for the counter lock.
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,

    /// Delay between lock attempts while waiting.
    #[serde(default = "default_lock_retry_ms")]
    pub lock_retry_ms: u64,

    /// Expiry applied to stored counter values.
    #[serde(default = "default_counter_ttl_secs")]
    pub counter_ttl_secs: u64,
}

const fn default_lock_ttl_ms() -> u64 {
    10_000
}

const fn default_lock_wait_ms() -> u64 {
    10_000
}

const fn default_lock_retry_ms() -> u64 {
    10
}

const fn default_counter_ttl_secs() -> u64 {
    10 * 365 * 24 * 60 * 60 // ten years
}

impl CounterConfig {
    /// Lock lifetime as a `Duration`.
    #[must_use]
    pub const fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    /// Lock wait bound as a `Duration`.
    #[must_use]
    pub const fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    /// Lock retry interval as a `Duration`.
    #[must_use]
    pub const fn lock_retry(&self) -> Duration {
        Duration::from_millis(self.lock_retry_ms)
    }

    /// Counter expiry as a `Duration`.
    #[must_use]
    pub const fn counter_ttl(&self) -> Duration {
        Duration::from_secs(self.counter_ttl_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_ttl_ms == 0 {
            return Err(ConfigError::Message(
                "counter.lock_ttl_ms cannot be 0".to_string(),
            ));
        }
        if self.lock_wait_ms == 0 {
            return Err(ConfigError::Message(
                "counter.lock_wait_ms cannot be 0".to_string(),
            ));
        }
        if self.lock_retry_ms == 0 || self.lock_retry_ms > self.lock_wait_ms {
            return Err(ConfigError::Message(
                "counter.lock_retry_ms must be between 1 and lock_wait_ms".to_string(),
            ));
        }
        if self.counter_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "counter.counter_ttl_secs cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            lock_ttl_ms: default_lock_ttl_ms(),
            lock_wait_ms: default_lock_wait_ms(),
            lock_retry_ms: default_lock_retry_ms(),
            counter_ttl_secs: default_counter_ttl_secs(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Admin token for settings and counter administration.
    #[serde(default = "default_admin_token")]
    pub admin_token: String,

    /// Tokens accepted on the ID generation routes.
    #[serde(default)]
    pub api_tokens: Vec<String>,
}

fn default_admin_token() -> String {
    "admin_change_me_in_production".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_token: default_admin_token(),
            api_tokens: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Enable Prometheus metrics endpoint.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

const fn default_metrics_enabled() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.counter.lock_wait(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_counter_config_validation() {
        let mut config = AppConfig::default();
        config.counter.lock_wait_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.counter.lock_retry_ms = config.counter.lock_wait_ms + 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.counter.counter_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_admin_token_rejected() {
        let mut config = AppConfig::default();
        config.auth.admin_token = String::new();
        assert!(config.validate().is_err());
    }
}
