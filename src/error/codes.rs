//! Error code constants.
//!
//! Error codes are grouped by range:
//! - 1xxx: Configuration and generation errors
//! - 2xxx: Authentication/Authorization errors
//! - 3xxx: Validation errors
//! - 5xxx: Internal/System errors

/// Numeric error code carried in every error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(i32);

impl ErrorCode {
    // ===== Configuration / Generation Errors (1xxx) =====

    /// Tenant profile not found.
    pub const TENANT_NOT_FOUND: Self = Self(1001);

    /// Tenant profile already exists.
    pub const TENANT_EXISTS: Self = Self(1002);

    /// Invalid format settings.
    pub const INVALID_CONFIG: Self = Self(1003);

    /// Rendered identifier failed validation.
    pub const GENERATION_FAILED: Self = Self(1005);

    // ===== Authentication/Authorization Errors (2xxx) =====

    /// Authentication required.
    pub const UNAUTHORIZED: Self = Self(2001);

    /// Insufficient permissions.
    pub const FORBIDDEN: Self = Self(2002);

    // ===== Validation Errors (3xxx) =====

    /// Bad request / invalid parameters.
    pub const BAD_REQUEST: Self = Self(3001);

    // ===== Internal/System Errors (5xxx) =====

    /// Storage backend error.
    pub const STORAGE_ERROR: Self = Self(5001);

    /// Internal server error.
    pub const INTERNAL_ERROR: Self = Self(5002);

    /// Service unavailable.
    pub const SERVICE_UNAVAILABLE: Self = Self(5003);

    /// Counter lock could not be acquired in time.
    pub const LOCK_TIMEOUT: Self = Self(5004);

    /// Get the error code as an i32.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::TENANT_NOT_FOUND.as_i32(), 1001);
        assert_eq!(ErrorCode::GENERATION_FAILED.as_i32(), 1005);
        assert_eq!(ErrorCode::UNAUTHORIZED.as_i32(), 2001);
        assert_eq!(ErrorCode::LOCK_TIMEOUT.as_i32(), 5004);
    }
}
