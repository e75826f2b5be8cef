//! Tenant references and per-tenant ID settings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::IdFormat;

/// Storage key for the settings used when a request names no tenant.
pub const GLOBAL_SETTINGS_KEY: &str = "__global__";

/// Longest accepted tenant ID, in bytes.
pub const MAX_TENANT_ID_LEN: usize = 255;

/// Check whether a tenant ID collides with the reserved `__name__` space.
#[must_use]
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with("__") || name.ends_with("__")
}

/// The parts of a tenant the generator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRef {
    /// Tenant identifier.
    pub id: String,

    /// Display name of the school.
    #[serde(default)]
    pub name: String,

    /// Explicit school code, used verbatim for `{SCHOOL}` when set.
    #[serde(default)]
    pub code: Option<String>,
}

impl TenantRef {
    /// Create a tenant reference without an explicit code.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: None,
        }
    }

    /// Set the explicit school code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// ID settings owned by the settings subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSettings {
    /// Format per ID type.
    #[serde(default)]
    pub id_formats: HashMap<String, IdFormat>,

    /// Prefix per ID type (keyed without the `_id` suffix).
    #[serde(default)]
    pub prefixes: HashMap<String, String>,
}

impl TenantSettings {
    /// Validate every stored format.
    ///
    /// # Errors
    ///
    /// Returns a description naming the offending ID type.
    pub fn validate(&self) -> Result<(), String> {
        for (id_type, format) in &self.id_formats {
            if id_type.is_empty() {
                return Err("id_formats keys cannot be empty".to_string());
            }
            format
                .validate()
                .map_err(|e| format!("id_formats.{id_type}: {e}"))?;
        }
        Ok(())
    }
}

/// A tenant as stored by the settings backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProfile {
    /// Tenant identifier.
    pub id: String,

    /// Display name of the school.
    #[serde(default)]
    pub name: String,

    /// Explicit school code.
    #[serde(default)]
    pub code: Option<String>,

    /// ID settings for this tenant.
    #[serde(default, flatten)]
    pub settings: TenantSettings,
}

impl TenantProfile {
    /// Reference handed to the generator.
    #[must_use]
    pub fn tenant_ref(&self) -> TenantRef {
        TenantRef {
            id: self.id.clone(),
            name: self.name.clone(),
            code: self.code.clone(),
        }
    }

    /// Validate the profile before it is stored.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("id cannot be empty".to_string());
        }
        if self.id.len() > MAX_TENANT_ID_LEN {
            return Err(format!("id cannot exceed {MAX_TENANT_ID_LEN} bytes"));
        }
        if is_reserved_name(&self.id) {
            return Err("id cannot start or end with '__' (reserved)".to_string());
        }
        self.settings.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name(GLOBAL_SETTINGS_KEY));
        assert!(is_reserved_name("__school"));
        assert!(is_reserved_name("school__"));
        assert!(!is_reserved_name("_school"));
        assert!(!is_reserved_name("green_valley"));
    }

    #[test]
    fn test_profile_validation() {
        let profile = TenantProfile {
            id: "green-valley".to_string(),
            name: "Green Valley High".to_string(),
            code: None,
            settings: TenantSettings::default(),
        };
        assert!(profile.validate().is_ok());

        let mut reserved = profile.clone();
        reserved.id = "__global__".to_string();
        assert!(reserved.validate().unwrap_err().contains("reserved"));

        let mut bad_format = profile;
        bad_format.settings.id_formats.insert(
            "staff_id".to_string(),
            IdFormat {
                pattern: "{PREFIX}".to_string(),
                ..Default::default()
            },
        );
        assert!(bad_format.validate().unwrap_err().contains("staff_id"));
    }

    #[test]
    fn test_profile_json_is_flat() {
        let json = r#"{
            "id": "gv",
            "name": "Green Valley",
            "code": "GVH",
            "id_formats": {"student_id": {"pattern": "{SCHOOL}/{SEQUENCE}", "separator": "/"}},
            "prefixes": {"student": "STD"}
        }"#;
        let profile: TenantProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.code.as_deref(), Some("GVH"));
        assert_eq!(profile.settings.prefixes["student"], "STD");
        assert_eq!(profile.settings.id_formats["student_id"].sequence_length, 6);
        assert_eq!(profile.tenant_ref().name, "Green Valley");
    }
}
