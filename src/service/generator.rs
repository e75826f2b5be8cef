//! ID generation service.
//!
//! Resolves the effective format for a request, reserves the next sequence
//! value and renders the identifier.

use std::sync::Arc;

use crate::config::CounterConfig;
use crate::domain::{CounterKey, TenantRef, TenantSettings};
use crate::error::{AppError, Result};
use crate::service::counter::SequenceCounter;
use crate::service::formatter::Formatter;
use crate::service::pattern::{self, ResolvedPattern};
use crate::storage::traits::Storage;

/// Service generating human-readable sequential IDs.
pub struct IdGenerator {
    /// Storage backend for settings lookups.
    storage: Arc<dyn Storage>,
    /// Lock-guarded counters.
    counter: SequenceCounter,
    /// Renderer.
    formatter: Formatter,
}

impl IdGenerator {
    /// Create a new ID generator.
    pub fn new(storage: Arc<dyn Storage>, config: &CounterConfig) -> Self {
        Self {
            counter: SequenceCounter::new(storage.clone(), config),
            storage,
            formatter: Formatter::new(),
        }
    }

    /// Generate the next identifier of `id_type`.
    ///
    /// # Arguments
    ///
    /// * `id_type` - ID type, e.g. `student_id`
    /// * `tenant` - Owning tenant; `None` uses the global sequence and settings
    /// * `year` - Year override; defaults to the current year
    ///
    /// # Errors
    ///
    /// Returns `AppError::LockTimeout` if the counter lock is contended past the
    /// configured wait, `AppError::GenerationFailed` if the rendered ID is empty
    /// or too long, or a storage error. A failed render still consumes its
    /// sequence value.
    pub async fn generate(
        &self,
        id_type: &str,
        tenant: Option<&TenantRef>,
        year: Option<i32>,
    ) -> Result<String> {
        if id_type.is_empty() {
            return Err(AppError::BadRequest("id_type cannot be empty".to_string()));
        }

        let settings = self.settings_for(tenant).await?;
        let resolved = pattern::resolve(id_type, tenant, settings.as_ref(), year);
        let key = CounterKey::new(
            id_type,
            tenant.map(|t| t.id.clone()),
            resolved.values.year,
        );

        let sequence = match self.counter.next_value(&key).await {
            Ok(sequence) => sequence,
            Err(e) => {
                let reason = if matches!(e, AppError::LockTimeout(_)) {
                    "lock_timeout"
                } else {
                    "storage"
                };
                metrics::counter!("schoolid_generation_failures_total", "reason" => reason)
                    .increment(1);
                return Err(e);
            }
        };

        self.render(id_type, tenant, &resolved, sequence)
    }

    /// Generate `count` identifiers in order.
    ///
    /// Each identifier takes the counter lock separately.
    ///
    /// # Errors
    ///
    /// Stops at the first failure; values reserved before it are consumed.
    pub async fn generate_batch(
        &self,
        id_type: &str,
        tenant: Option<&TenantRef>,
        year: Option<i32>,
        count: u32,
    ) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            ids.push(self.generate(id_type, tenant, year).await?);
        }
        Ok(ids)
    }

    /// Reset the counter for `(id_type, tenant_id, year)`.
    ///
    /// Returns whether a counter existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter lock cannot be acquired or storage fails.
    pub async fn reset_counter(
        &self,
        id_type: &str,
        tenant_id: Option<&str>,
        year: Option<i32>,
    ) -> Result<bool> {
        let key = Self::counter_key(id_type, tenant_id, year);
        self.counter.reset(&key).await
    }

    /// Last value handed out for `(id_type, tenant_id, year)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter lock cannot be acquired or storage fails.
    pub async fn current(
        &self,
        id_type: &str,
        tenant_id: Option<&str>,
        year: Option<i32>,
    ) -> Result<(CounterKey, u64)> {
        let key = Self::counter_key(id_type, tenant_id, year);
        let value = self.counter.current(&key).await?;
        Ok((key, value))
    }

    fn counter_key(id_type: &str, tenant_id: Option<&str>, year: Option<i32>) -> CounterKey {
        CounterKey::new(
            id_type,
            tenant_id.map(str::to_string),
            year.unwrap_or_else(pattern::current_year),
        )
    }

    async fn settings_for(&self, tenant: Option<&TenantRef>) -> Result<Option<TenantSettings>> {
        let settings = match tenant {
            Some(tenant) => self
                .storage
                .get_tenant(&tenant.id)
                .await?
                .map(|profile| profile.settings),
            None => self.storage.get_global_settings().await?,
        };
        Ok(settings)
    }

    fn render(
        &self,
        id_type: &str,
        tenant: Option<&TenantRef>,
        resolved: &ResolvedPattern,
        sequence: u64,
    ) -> Result<String> {
        match self.formatter.format(resolved, sequence) {
            Ok(id) => {
                metrics::counter!("schoolid_ids_generated_total", "id_type" => id_type.to_string())
                    .increment(1);
                tracing::debug!(id_type, id = %id, sequence, "Generated ID");
                Ok(id)
            }
            Err(e) => {
                tracing::error!(
                    id_type,
                    tenant_id = tenant.map(|t| t.id.as_str()),
                    pattern = %resolved.format.pattern,
                    result = e.result(),
                    sequence,
                    error = %e,
                    "ID generation failed"
                );
                metrics::counter!("schoolid_generation_failures_total", "reason" => "invalid_id")
                    .increment(1);
                Err(AppError::GenerationFailed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::config::FileStorageConfig;
    use crate::domain::{IdFormat, MAX_TENANT_ID_LEN, TenantProfile};
    use crate::storage::MemoryStorage;
    use crate::storage::file::FileStorage;

    fn create_generator() -> (IdGenerator, Arc<dyn Storage>) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let config = CounterConfig {
            lock_wait_ms: 30_000,
            ..Default::default()
        };
        (IdGenerator::new(storage.clone(), &config), storage)
    }

    fn format(pattern: &str, sequence_length: usize) -> IdFormat {
        IdFormat {
            pattern: pattern.to_string(),
            sequence_length,
            separator: "-".to_string(),
        }
    }

    async fn save_tenant(storage: &Arc<dyn Storage>, id: &str, code: Option<&str>, fmt: IdFormat) {
        let mut settings = TenantSettings::default();
        settings.id_formats.insert("student_id".to_string(), fmt);
        settings
            .prefixes
            .insert("student".to_string(), "STU".to_string());

        let profile = TenantProfile {
            id: id.to_string(),
            name: "Alpha Beta College".to_string(),
            code: code.map(str::to_string),
            settings,
        };
        storage.save_tenant(&profile).await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_full_pattern() {
        let (generator, storage) = create_generator();
        save_tenant(
            &storage,
            "abc",
            Some("ABC"),
            format("{PREFIX}-{SCHOOL}-{YEAR}-{SEQUENCE}", 6),
        )
        .await;

        let tenant = TenantRef::new("abc", "Alpha Beta College").with_code("ABC");
        let id = generator
            .generate("student_id", Some(&tenant), Some(2026))
            .await
            .unwrap();
        assert_eq!(id, "STU-ABC-2026-000001");

        let id = generator
            .generate("student_id", Some(&tenant), Some(2026))
            .await
            .unwrap();
        assert_eq!(id, "STU-ABC-2026-000002");
    }

    #[tokio::test]
    async fn test_empty_school_code_collapses_separators() {
        let (generator, storage) = create_generator();
        save_tenant(
            &storage,
            "abc",
            Some(""),
            format("{PREFIX}--{SCHOOL}-{SEQUENCE}", 6),
        )
        .await;

        let tenant = TenantRef::new("abc", "Alpha Beta College").with_code("");
        for _ in 0..6 {
            generator
                .generate("student_id", Some(&tenant), Some(2026))
                .await
                .unwrap();
        }

        let id = generator
            .generate("student_id", Some(&tenant), Some(2026))
            .await
            .unwrap();
        assert_eq!(id, "STU-000007");
    }

    #[tokio::test]
    async fn test_defaults_without_settings() {
        let (generator, _) = create_generator();

        let id = generator.generate("invoice", None, None).await.unwrap();
        assert_eq!(id, "INV-000001");

        let tenant = TenantRef::new("unknown", "Green Valley");
        let id = generator
            .generate("student_id", Some(&tenant), None)
            .await
            .unwrap();
        assert_eq!(id, "STU-000001");
    }

    #[tokio::test]
    async fn test_global_settings_apply_without_tenant() {
        let (generator, storage) = create_generator();
        let mut settings = TenantSettings::default();
        settings
            .id_formats
            .insert("receipt".to_string(), format("{PREFIX}/{YEAR}/{SEQUENCE}", 4));
        settings
            .prefixes
            .insert("receipt".to_string(), "RCP".to_string());
        storage.save_global_settings(&settings).await.unwrap();

        let id = generator
            .generate("receipt", None, Some(2025))
            .await
            .unwrap();
        assert_eq!(id, "RCP/2025/0001");
    }

    #[tokio::test]
    async fn test_years_have_separate_sequences() {
        let (generator, _) = create_generator();

        generator.generate("student_id", None, Some(2025)).await.unwrap();
        generator.generate("student_id", None, Some(2025)).await.unwrap();

        let id = generator
            .generate("student_id", None, Some(2026))
            .await
            .unwrap();
        assert_eq!(id, "STU-000001");
    }

    #[tokio::test]
    async fn test_reset_counter() {
        let (generator, _) = create_generator();
        let tenant = TenantRef::new("abc", "Alpha");

        for _ in 0..3 {
            generator
                .generate("student_id", Some(&tenant), Some(2026))
                .await
                .unwrap();
        }

        let (key, value) = generator
            .current("student_id", Some("abc"), Some(2026))
            .await
            .unwrap();
        assert_eq!(key.cache_key(), "id_counter:student_id:abc:2026");
        assert_eq!(value, 3);

        assert!(
            generator
                .reset_counter("student_id", Some("abc"), Some(2026))
                .await
                .unwrap()
        );

        let id = generator
            .generate("student_id", Some(&tenant), Some(2026))
            .await
            .unwrap();
        assert_eq!(id, "STU-000001");
    }

    #[tokio::test]
    async fn test_too_long_fails_and_consumes_value() {
        let (generator, storage) = create_generator();
        save_tenant(
            &storage,
            "long",
            Some(&"X".repeat(48)),
            format("{PREFIX}-{SCHOOL}-{SEQUENCE}", 6),
        )
        .await;
        let tenant = TenantRef::new("long", "Long").with_code("X".repeat(48));

        let err = generator
            .generate("student_id", Some(&tenant), Some(2026))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationFailed(_)));

        let (_, value) = generator
            .current("student_id", Some("long"), Some(2026))
            .await
            .unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_tenant_named_global_has_its_own_sequence() {
        let (generator, _) = create_generator();

        for _ in 0..3 {
            generator
                .generate("student_id", None, Some(2026))
                .await
                .unwrap();
        }

        for id in ["global", "__global__"] {
            let tenant = TenantRef::new(id, "Global Academy");
            let generated = generator
                .generate("student_id", Some(&tenant), Some(2026))
                .await
                .unwrap();
            assert_eq!(generated, "STU-000001", "tenant {id}");
        }

        let id = generator
            .generate("student_id", None, Some(2026))
            .await
            .unwrap();
        assert_eq!(id, "STU-000004");
    }

    #[tokio::test]
    async fn test_colon_in_id_type_or_tenant_keeps_sequences_apart() {
        let (generator, _) = create_generator();

        let c = TenantRef::new("c", "C School");
        let bc = TenantRef::new("b:c", "BC School");

        generator.generate("a:b", Some(&c), Some(2026)).await.unwrap();
        generator.generate("a:b", Some(&c), Some(2026)).await.unwrap();

        let (_, value) = generator.current("a", Some("b:c"), Some(2026)).await.unwrap();
        assert_eq!(value, 0);

        generator.generate("a", Some(&bc), Some(2026)).await.unwrap();
        let (_, value) = generator.current("a:b", Some("c"), Some(2026)).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_longest_tenant_id_on_file_backend() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(
            FileStorage::new(&FileStorageConfig {
                data_dir: temp_dir.path().to_path_buf(),
            })
            .unwrap(),
        );
        let generator = IdGenerator::new(storage.clone(), &CounterConfig::default());

        let profile = TenantProfile {
            id: "é".repeat(MAX_TENANT_ID_LEN / 2),
            name: "Long Name School".to_string(),
            code: Some("LNS".to_string()),
            settings: TenantSettings::default(),
        };
        assert!(profile.validate().is_ok());
        storage.save_tenant(&profile).await.unwrap();

        let tenant = profile.tenant_ref();
        for expected in ["STU-000001", "STU-000002"] {
            let id = generator
                .generate("student_id", Some(&tenant), Some(2026))
                .await
                .unwrap();
            assert_eq!(id, expected);
        }

        assert_eq!(storage.get_tenant(&profile.id).await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_generate_lock_timeout() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let config = CounterConfig {
            lock_wait_ms: 50,
            lock_retry_ms: 5,
            ..Default::default()
        };
        let generator = IdGenerator::new(storage.clone(), &config);

        let key = CounterKey::new("student_id", None, 2026);
        let held = storage
            .try_acquire(&key.lock_key(), std::time::Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();

        let err = generator
            .generate("student_id", None, Some(2026))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LockTimeout(_)));

        held.release().await;
        let id = generator
            .generate("student_id", None, Some(2026))
            .await
            .unwrap();
        assert_eq!(id, "STU-000001");
    }

    #[tokio::test]
    async fn test_empty_id_type_rejected() {
        let (generator, _) = create_generator();
        let err = generator.generate("", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_generate_batch() {
        let (generator, _) = create_generator();
        let ids = generator
            .generate_batch("staff_id", None, Some(2026), 3)
            .await
            .unwrap();
        assert_eq!(ids, vec!["STA-000001", "STA-000002", "STA-000003"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_generation_is_unique() {
        let (generator, _) = create_generator();
        let generator = Arc::new(generator);
        let tenant = TenantRef::new("abc", "Alpha").with_code("ABC");

        let mut handles = Vec::new();
        for _ in 0..100 {
            let generator = generator.clone();
            let tenant = tenant.clone();
            handles.push(tokio::spawn(async move {
                generator
                    .generate("student_id", Some(&tenant), Some(2026))
                    .await
            }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap());
        }

        let expected: HashSet<String> = (1..=100).map(|n| format!("STU-{n:06}")).collect();
        assert_eq!(ids, expected);
    }
}
