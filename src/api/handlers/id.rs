//! ID generation handlers.

use axum::{
    Json,
    extract::{Query, State},
};

use crate::api::state::AppState;
use crate::domain::{ApiResponse, GenerateQuery, GeneratedIdsResponse};
use crate::error::{AppError, Result};

/// Generate one or more IDs.
///
/// The tenant, when given, must have a stored profile; its name and code feed
/// `{SCHOOL}`.
///
/// # Errors
///
/// Returns an error if the query is invalid, the tenant is unknown, the counter
/// lock times out, or the rendered ID is rejected.
pub async fn generate(
    State(state): State<AppState>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<ApiResponse<GeneratedIdsResponse>>> {
    query.validate().map_err(AppError::BadRequest)?;

    let tenant = match query.tenant.as_deref() {
        Some(id) => Some(state.settings_service.get_tenant(id).await?.tenant_ref()),
        None => None,
    };

    let ids = state
        .generator
        .generate_batch(&query.id_type, tenant.as_ref(), query.year, query.count)
        .await?;

    Ok(Json(ApiResponse::success(GeneratedIdsResponse { ids })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::domain::{IdFormat, TenantProfile, TenantSettings};
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    fn create_test_app_state() -> AppState {
        AppState::new(
            Arc::new(AppConfig::default()),
            Arc::new(MemoryStorage::new()),
        )
    }

    fn query(id_type: &str, tenant: Option<&str>, count: u32) -> GenerateQuery {
        GenerateQuery {
            id_type: id_type.to_string(),
            tenant: tenant.map(str::to_string),
            year: Some(2026),
            count,
        }
    }

    #[tokio::test]
    async fn test_generate_for_tenant() {
        let state = create_test_app_state();

        let mut settings = TenantSettings::default();
        settings.id_formats.insert(
            "student_id".to_string(),
            IdFormat {
                pattern: "{PREFIX}-{SCHOOL}-{YEAR}-{SEQUENCE}".to_string(),
                sequence_length: 6,
                separator: "-".to_string(),
            },
        );
        state
            .settings_service
            .create_tenant(TenantProfile {
                id: "abc".to_string(),
                name: "Alpha Beta".to_string(),
                code: Some("ABC".to_string()),
                settings,
            })
            .await
            .unwrap();

        let response = generate(State(state), Query(query("student_id", Some("abc"), 2)))
            .await
            .unwrap();
        assert_eq!(
            response.0.data.unwrap().ids,
            vec!["STU-ABC-2026-000001", "STU-ABC-2026-000002"]
        );
    }

    #[tokio::test]
    async fn test_generate_unknown_tenant() {
        let state = create_test_app_state();

        let err = generate(State(state), Query(query("student_id", Some("nope"), 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TenantNotFound(_)));
    }

    #[tokio::test]
    async fn test_generate_validates_count() {
        let state = create_test_app_state();

        let err = generate(State(state.clone()), Query(query("student_id", None, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = generate(State(state), Query(query("student_id", None, 101)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
