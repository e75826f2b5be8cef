//! Data Transfer Objects for API requests and responses.

use serde::{Deserialize, Serialize};

/// Most IDs a single generate request may ask for.
pub const MAX_GENERATE_COUNT: u32 = 100;

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response code (0 = success, non-zero = error).
    pub code: i32,

    /// Human-readable message.
    pub message: String,

    /// Response data (null on error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a success response.
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Create a success response with no data.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: None,
        }
    }
}

/// Query for ID generation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateQuery {
    /// ID type, e.g. `student_id`.
    pub id_type: String,

    /// Tenant ID; omitted for global IDs.
    #[serde(default)]
    pub tenant: Option<String>,

    /// Year override.
    #[serde(default)]
    pub year: Option<i32>,

    /// Number of IDs to generate (default: 1).
    #[serde(default = "default_count")]
    pub count: u32,
}

const fn default_count() -> u32 {
    1
}

impl GenerateQuery {
    /// Validate the query.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid parameter.
    pub fn validate(&self) -> Result<(), String> {
        if self.id_type.is_empty() {
            return Err("id_type is required".to_string());
        }
        if self.count == 0 {
            return Err("count must be at least 1".to_string());
        }
        if self.count > MAX_GENERATE_COUNT {
            return Err(format!("count cannot exceed {MAX_GENERATE_COUNT}"));
        }
        Ok(())
    }
}

/// Response for ID generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedIdsResponse {
    /// Generated identifiers, in sequence order.
    pub ids: Vec<String>,
}

/// Identifies one counter in admin requests.
#[derive(Debug, Clone, Deserialize)]
pub struct CounterRequest {
    /// ID type.
    pub id_type: String,

    /// Tenant ID; omitted for the global counter.
    #[serde(default)]
    pub tenant: Option<String>,

    /// Year; defaults to the current year.
    #[serde(default)]
    pub year: Option<i32>,
}

impl CounterRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error if `id_type` is empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.id_type.is_empty() {
            return Err("id_type is required".to_string());
        }
        Ok(())
    }
}

/// Current value of one counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterResponse {
    /// Cache key of the counter.
    pub key: String,

    /// Last value handed out (0 when never used).
    pub value: u64,
}

/// Query for listing tenants with pagination.
#[derive(Debug, Clone, Deserialize)]
pub struct ListTenantQuery {
    /// Filter by tenant ID prefix.
    #[serde(default)]
    pub key: Option<String>,

    /// Return tenants after this ID.
    #[serde(default)]
    pub from: Option<String>,

    /// Page size (default 20, max 1000).
    #[serde(default = "default_page_size")]
    pub size: u32,
}

const fn default_page_size() -> u32 {
    20
}

impl ListTenantQuery {
    /// Validate the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the page size is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if self.size == 0 {
            return Err("size must be at least 1".to_string());
        }
        if self.size > 1000 {
            return Err("size cannot exceed 1000".to_string());
        }
        Ok(())
    }
}

/// Tenant entry in a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSummary {
    /// Tenant ID.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Number of configured ID formats.
    pub format_count: usize,
}

/// Page of tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTenantResponse {
    /// Tenants on this page.
    pub items: Vec<TenantSummary>,

    /// Cursor for the next page.
    pub next_cursor: Option<String>,

    /// Whether more tenants follow.
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success(vec!["STU-000001".to_string()]);
        assert_eq!(response.code, 0);
        assert_eq!(response.message, "success");
        assert_eq!(response.data.unwrap().len(), 1);
    }

    #[test]
    fn test_generate_query_validation() {
        let query = GenerateQuery {
            id_type: "student_id".to_string(),
            tenant: None,
            year: None,
            count: 10,
        };
        assert!(query.validate().is_ok());

        let mut bad = query.clone();
        bad.id_type = String::new();
        assert!(bad.validate().is_err());

        let mut bad = query.clone();
        bad.count = 0;
        assert!(bad.validate().is_err());

        let mut bad = query;
        bad.count = MAX_GENERATE_COUNT + 1;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_list_query_validation() {
        let query: ListTenantQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.size, 20);
        assert!(query.validate().is_ok());

        let query: ListTenantQuery = serde_json::from_str(r#"{"size": 0}"#).unwrap();
        assert!(query.validate().is_err());
    }
}
