//! Error handling module.
//!
//! This module provides unified error handling with proper HTTP status code mapping
//! and standardized API error responses.

pub mod codes;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub use codes::ErrorCode;

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Tenant profile not found.
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// Tenant profile already exists.
    #[error("Tenant already exists: {0}")]
    TenantExists(String),

    /// Invalid format settings or tenant profile.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The per-key counter lock could not be acquired within the wait bound.
    #[error("Counter lock timeout: {0}")]
    LockTimeout(String),

    /// The rendered identifier was empty or too long.
    #[error("ID generation failed: {0}")]
    GenerationFailed(String),

    /// Missing or unknown bearer token.
    #[error("Authentication failed: {0}")]
    Unauthorized(&'static str),

    /// Token lacks the required role.
    #[error("Insufficient permissions: {0}")]
    Forbidden(&'static str),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a storage error, lifting lock timeouts into their own variant.
    #[must_use]
    pub fn from_storage(err: StorageError) -> Self {
        match err {
            StorageError::LockTimeout(key) => Self::LockTimeout(key),
            other => Self::Storage(other),
        }
    }

    /// Get the error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::TenantNotFound(_) => ErrorCode::TENANT_NOT_FOUND,
            Self::TenantExists(_) => ErrorCode::TENANT_EXISTS,
            Self::InvalidConfig(_) => ErrorCode::INVALID_CONFIG,
            Self::LockTimeout(_) => ErrorCode::LOCK_TIMEOUT,
            Self::GenerationFailed(_) => ErrorCode::GENERATION_FAILED,
            Self::Unauthorized(_) => ErrorCode::UNAUTHORIZED,
            Self::Forbidden(_) => ErrorCode::FORBIDDEN,
            Self::BadRequest(_) => ErrorCode::BAD_REQUEST,
            Self::Storage(_) => ErrorCode::STORAGE_ERROR,
            Self::Internal(_) => ErrorCode::INTERNAL_ERROR,
        }
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::TenantNotFound(_) => StatusCode::NOT_FOUND,
            Self::TenantExists(_) => StatusCode::CONFLICT,
            Self::InvalidConfig(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::GenerationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::LockTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().as_i32();
        let message = self.to_string();

        tracing::error!(
            error_code = code,
            status = %status,
            message = %message,
            "Request failed"
        );

        let body = Json(json!({
            "code": code,
            "message": message,
            "data": null
        }));

        (status, body).into_response()
    }
}

/// Storage-specific error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Connection error.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Query failed: {0}")]
    Query(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Lock acquisition failed.
    #[error("Failed to acquire lock: {0}")]
    LockFailed(String),

    /// Lock timeout.
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// File I/O error.
    #[error("File I/O error: {0}")]
    FileIO(String),

    /// Backend not available.
    #[error("Storage backend unavailable")]
    Unavailable,
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::FileIO(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for StorageError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for StorageError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        Self::Query(err.to_string())
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias using `StorageError`.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
