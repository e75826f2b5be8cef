//! Counter keys and persisted counter state.

use serde::{Deserialize, Serialize};

use super::{GLOBAL_SETTINGS_KEY, is_reserved_name};

/// Identifies one independent sequence: `(id_type, tenant, year)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    /// ID type, e.g. `student_id`.
    pub id_type: String,

    /// Owning tenant; `None` for the global sequence.
    pub tenant_id: Option<String>,

    /// Calendar year the sequence belongs to.
    pub year: i32,
}

impl CounterKey {
    /// Create a counter key.
    pub fn new(id_type: impl Into<String>, tenant_id: Option<String>, year: i32) -> Self {
        Self {
            id_type: id_type.into(),
            tenant_id,
            year,
        }
    }

    /// Cache key the counter value is stored under.
    ///
    /// Distinct `(id_type, tenant, year)` triples always give distinct keys:
    /// `%` and `:` are escaped in each part, the global sequence uses
    /// [`GLOBAL_SETTINGS_KEY`], and a reserved tenant ID has its `_` escaped
    /// so it can never spell that token.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let tenant = self.tenant_id.as_deref().map_or_else(
            || GLOBAL_SETTINGS_KEY.to_string(),
            |id| escape_part(id, is_reserved_name(id)),
        );
        format!(
            "id_counter:{}:{tenant}:{}",
            escape_part(&self.id_type, false),
            self.year
        )
    }

    /// Name of the lock guarding this counter.
    #[must_use]
    pub fn lock_key(&self) -> String {
        format!("{}:lock", self.cache_key())
    }
}

impl std::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cache_key())
    }
}

fn escape_part(part: &str, escape_underscore: bool) -> String {
    let mut escaped = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            ':' => escaped.push_str("%3A"),
            '_' if escape_underscore => escaped.push_str("%5F"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Stored form of a cached counter value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterState {
    /// Cache key.
    pub key: String,

    /// Last value handed out.
    pub value: u64,

    /// Expiry (milliseconds since epoch).
    pub expires_at: i64,

    /// Last update timestamp (milliseconds since epoch).
    pub updated_at: i64,
}

impl CounterState {
    /// Create a state that expires `ttl` from now.
    #[must_use]
    pub fn new(key: String, value: u64, ttl: std::time::Duration) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            key,
            value,
            expires_at: now.saturating_add(ttl_ms),
            updated_at: now,
        }
    }

    /// Whether the value has outlived its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp_millis() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_cache_key() {
        let key = CounterKey::new("student_id", Some("gv".to_string()), 2026);
        assert_eq!(key.cache_key(), "id_counter:student_id:gv:2026");
        assert_eq!(key.lock_key(), "id_counter:student_id:gv:2026:lock");

        let key = CounterKey::new("invoice_no", None, 2025);
        assert_eq!(key.to_string(), "id_counter:invoice_no:__global__:2025");
    }

    #[test]
    fn test_global_and_named_tenants_never_share_a_key() {
        let global = CounterKey::new("student_id", None, 2026);

        for id in ["global", "__global__", "%5F%5Fglobal%5F%5F"] {
            let tenant = CounterKey::new("student_id", Some(id.to_string()), 2026);
            assert_ne!(tenant.cache_key(), global.cache_key(), "tenant {id}");
        }

        let reserved = CounterKey::new("student_id", Some("__global__".to_string()), 2026);
        let escaped = CounterKey::new("student_id", Some("%5F%5Fglobal%5F%5F".to_string()), 2026);
        assert_ne!(reserved.cache_key(), escaped.cache_key());
    }

    #[test]
    fn test_colons_cannot_shift_parts() {
        let a = CounterKey::new("a:b", Some("c".to_string()), 2026);
        let b = CounterKey::new("a", Some("b:c".to_string()), 2026);
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "id_counter:a%3Ab:c:2026");
        assert_eq!(b.cache_key(), "id_counter:a:b%3Ac:2026");

        let percent = CounterKey::new("a%3Ab", Some("c".to_string()), 2026);
        assert_ne!(percent.cache_key(), a.cache_key());
    }

    #[test]
    fn test_counter_state_expiry() {
        let state = CounterState::new("k".to_string(), 3, Duration::from_secs(60));
        assert!(!state.is_expired());

        let state = CounterState::new("k".to_string(), 3, Duration::ZERO);
        assert!(state.is_expired());
    }
}
