//! Tenant and global settings handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::api::state::AppState;
use crate::domain::{
    ApiResponse, ListTenantQuery, ListTenantResponse, TenantProfile, TenantSettings,
    TenantSummary,
};
use crate::error::{AppError, Result};

/// Query parameters addressing one tenant.
#[derive(Debug, Deserialize)]
pub struct TenantIdQuery {
    /// Tenant ID.
    pub id: String,
}

// ============== List Tenants ==============

/// List tenants with cursor pagination.
///
/// # Errors
///
/// Returns an error if the query parameters are invalid or storage fails.
pub async fn list_tenants(
    State(state): State<AppState>,
    Query(query): Query<ListTenantQuery>,
) -> Result<Json<ApiResponse<ListTenantResponse>>> {
    query.validate().map_err(AppError::BadRequest)?;

    let page = state
        .settings_service
        .list_tenants(
            query.key.as_deref(),
            query.from.as_deref(),
            query.size as usize,
        )
        .await?;

    let items = page
        .items
        .into_iter()
        .map(|profile| TenantSummary {
            format_count: profile.settings.id_formats.len(),
            id: profile.id,
            name: profile.name,
        })
        .collect();

    Ok(Json(ApiResponse::success(ListTenantResponse {
        items,
        next_cursor: page.next_cursor,
        has_more: page.has_more,
    })))
}

// ============== Tenant Profiles ==============

/// Create a tenant profile.
///
/// # Errors
///
/// Returns an error if the profile is invalid or the ID already exists.
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(profile): Json<TenantProfile>,
) -> Result<Json<ApiResponse<()>>> {
    state.settings_service.create_tenant(profile).await?;
    Ok(Json(ApiResponse::ok()))
}

/// Replace an existing tenant profile.
///
/// # Errors
///
/// Returns an error if the profile is invalid or does not exist.
pub async fn update_tenant(
    State(state): State<AppState>,
    Json(profile): Json<TenantProfile>,
) -> Result<Json<ApiResponse<()>>> {
    state.settings_service.update_tenant(profile).await?;
    Ok(Json(ApiResponse::ok()))
}

/// Get a tenant profile.
///
/// # Errors
///
/// Returns an error if the tenant is not found.
pub async fn get_tenant(
    State(state): State<AppState>,
    Query(query): Query<TenantIdQuery>,
) -> Result<Json<ApiResponse<TenantProfile>>> {
    let profile = state.settings_service.get_tenant(&query.id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Delete a tenant profile.
///
/// # Errors
///
/// Returns an error if the tenant is not found.
pub async fn delete_tenant(
    State(state): State<AppState>,
    Query(query): Query<TenantIdQuery>,
) -> Result<Json<ApiResponse<()>>> {
    state.settings_service.delete_tenant(&query.id).await?;
    Ok(Json(ApiResponse::ok()))
}

// ============== Global Settings ==============

/// Get the global settings.
///
/// # Errors
///
/// Returns an error if storage fails.
pub async fn get_global(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TenantSettings>>> {
    let settings = state.settings_service.get_global().await?;
    Ok(Json(ApiResponse::success(settings)))
}

/// Replace the global settings.
///
/// # Errors
///
/// Returns an error if any format is invalid.
pub async fn save_global(
    State(state): State<AppState>,
    Json(settings): Json<TenantSettings>,
) -> Result<Json<ApiResponse<()>>> {
    state.settings_service.save_global(settings).await?;
    Ok(Json(ApiResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, FileStorageConfig};
    use crate::domain::IdFormat;
    use crate::storage::file::FileStorage;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_app_state(temp_dir: &TempDir) -> AppState {
        let storage_config = FileStorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
        };
        let storage = Arc::new(FileStorage::new(&storage_config).unwrap());

        let mut app_config = AppConfig::default();
        app_config.storage.file = storage_config;

        AppState::new(Arc::new(app_config), storage)
    }

    fn profile(id: &str) -> TenantProfile {
        let mut settings = TenantSettings::default();
        settings
            .id_formats
            .insert("student_id".to_string(), IdFormat::default());

        TenantProfile {
            id: id.to_string(),
            name: format!("School {id}"),
            code: None,
            settings,
        }
    }

    #[tokio::test]
    async fn test_list_tenants_empty() {
        let temp_dir = TempDir::new().unwrap();
        let state = create_test_app_state(&temp_dir);

        let query = ListTenantQuery {
            key: None,
            from: None,
            size: 20,
        };

        let result = list_tenants(State(state), Query(query)).await.unwrap();

        let data = result.0.data.unwrap();
        assert!(data.items.is_empty());
        assert!(!data.has_more);
        assert!(data.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_tenant_handlers() {
        let temp_dir = TempDir::new().unwrap();
        let state = create_test_app_state(&temp_dir);

        for id in ["north", "south", "east"] {
            create_tenant(State(state.clone()), Json(profile(id)))
                .await
                .unwrap();
        }

        let err = create_tenant(State(state.clone()), Json(profile("north")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TenantExists(_)));

        let fetched = get_tenant(
            State(state.clone()),
            Query(TenantIdQuery {
                id: "south".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(fetched.0.data.unwrap().name, "School south");

        let query = ListTenantQuery {
            key: None,
            from: None,
            size: 2,
        };
        let page = list_tenants(State(state.clone()), Query(query))
            .await
            .unwrap()
            .0
            .data
            .unwrap();
        let ids: Vec<&str> = page.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["east", "north"]);
        assert_eq!(page.items[0].format_count, 1);
        assert_eq!(page.next_cursor.as_deref(), Some("north"));

        delete_tenant(
            State(state.clone()),
            Query(TenantIdQuery {
                id: "south".to_string(),
            }),
        )
        .await
        .unwrap();

        let err = get_tenant(
            State(state),
            Query(TenantIdQuery {
                id: "south".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::TenantNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_rejects_invalid_size() {
        let temp_dir = TempDir::new().unwrap();
        let state = create_test_app_state(&temp_dir);

        let query = ListTenantQuery {
            key: None,
            from: None,
            size: 0,
        };
        let err = list_tenants(State(state), Query(query)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_global_settings_handlers() {
        let temp_dir = TempDir::new().unwrap();
        let state = create_test_app_state(&temp_dir);

        let mut settings = TenantSettings::default();
        settings
            .prefixes
            .insert("receipt".to_string(), "RCP".to_string());

        save_global(State(state.clone()), Json(settings.clone()))
            .await
            .unwrap();

        let fetched = get_global(State(state)).await.unwrap();
        assert_eq!(fetched.0.data.unwrap(), settings);
    }
}
