//! Counter administration handlers.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::api::state::AppState;
use crate::domain::{ApiResponse, CounterRequest, CounterResponse};
use crate::error::{AppError, Result};

/// Reset one counter so its next value is 1.
///
/// Previously issued IDs may be issued again afterwards.
///
/// # Errors
///
/// Returns an error if the request is invalid or the counter lock times out.
pub async fn reset(
    State(state): State<AppState>,
    Json(request): Json<CounterRequest>,
) -> Result<Json<ApiResponse<CounterResponse>>> {
    request.validate().map_err(AppError::BadRequest)?;

    state
        .generator
        .reset_counter(&request.id_type, request.tenant.as_deref(), request.year)
        .await?;

    let (key, value) = state
        .generator
        .current(&request.id_type, request.tenant.as_deref(), request.year)
        .await?;

    Ok(Json(ApiResponse::success(CounterResponse {
        key: key.cache_key(),
        value,
    })))
}

/// Peek at the last value issued for a counter.
///
/// # Errors
///
/// Returns an error if the request is invalid or the counter lock times out.
pub async fn current(
    State(state): State<AppState>,
    Query(request): Query<CounterRequest>,
) -> Result<Json<ApiResponse<CounterResponse>>> {
    request.validate().map_err(AppError::BadRequest)?;

    let (key, value) = state
        .generator
        .current(&request.id_type, request.tenant.as_deref(), request.year)
        .await?;

    Ok(Json(ApiResponse::success(CounterResponse {
        key: key.cache_key(),
        value,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn request(tenant: Option<&str>) -> CounterRequest {
        CounterRequest {
            id_type: "student_id".to_string(),
            tenant: tenant.map(str::to_string),
            year: Some(2026),
        }
    }

    #[tokio::test]
    async fn test_current_and_reset() {
        let state = AppState::new(
            Arc::new(AppConfig::default()),
            Arc::new(MemoryStorage::new()),
        );

        for _ in 0..4 {
            state
                .generator
                .generate("student_id", None, Some(2026))
                .await
                .unwrap();
        }

        let response = current(State(state.clone()), Query(request(None)))
            .await
            .unwrap()
            .0
            .data
            .unwrap();
        assert_eq!(response.key, "id_counter:student_id:__global__:2026");
        assert_eq!(response.value, 4);

        let response = reset(State(state.clone()), Json(request(None)))
            .await
            .unwrap()
            .0
            .data
            .unwrap();
        assert_eq!(response.value, 0);

        let id = state
            .generator
            .generate("student_id", None, Some(2026))
            .await
            .unwrap();
        assert_eq!(id, "STU-000001");
    }

    #[tokio::test]
    async fn test_rejects_empty_id_type() {
        let state = AppState::new(
            Arc::new(AppConfig::default()),
            Arc::new(MemoryStorage::new()),
        );

        let mut bad = request(Some("abc"));
        bad.id_type = String::new();

        let err = current(State(state), Query(bad)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
