//! Tenant and global settings management.

use std::sync::Arc;

use crate::domain::{TenantProfile, TenantSettings};
use crate::error::{AppError, Result};
use crate::storage::traits::Storage;

/// One page of tenant profiles.
#[derive(Debug, Clone)]
pub struct TenantPage {
    /// Profiles in ID order.
    pub items: Vec<TenantProfile>,
    /// Cursor for the next page.
    pub next_cursor: Option<String>,
    /// Whether more profiles follow.
    pub has_more: bool,
}

/// Service managing tenant profiles and global settings.
pub struct SettingsService {
    storage: Arc<dyn Storage>,
}

impl SettingsService {
    /// Create a new settings service.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create a tenant profile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidConfig` if the profile is invalid or
    /// `AppError::TenantExists` if the ID is taken.
    pub async fn create_tenant(&self, profile: TenantProfile) -> Result<TenantProfile> {
        profile.validate().map_err(AppError::InvalidConfig)?;

        if self.storage.get_tenant(&profile.id).await?.is_some() {
            return Err(AppError::TenantExists(profile.id));
        }

        self.storage.save_tenant(&profile).await?;
        tracing::info!(tenant = %profile.id, formats = profile.settings.id_formats.len(), "Tenant created");
        Ok(profile)
    }

    /// Replace an existing tenant profile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidConfig` if the profile is invalid or
    /// `AppError::TenantNotFound` if it does not exist.
    pub async fn update_tenant(&self, profile: TenantProfile) -> Result<TenantProfile> {
        profile.validate().map_err(AppError::InvalidConfig)?;

        if self.storage.get_tenant(&profile.id).await?.is_none() {
            return Err(AppError::TenantNotFound(profile.id));
        }

        self.storage.save_tenant(&profile).await?;
        tracing::info!(tenant = %profile.id, "Tenant updated");
        Ok(profile)
    }

    /// Get a tenant profile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::TenantNotFound` if it does not exist.
    pub async fn get_tenant(&self, id: &str) -> Result<TenantProfile> {
        self.storage
            .get_tenant(id)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(id.to_string()))
    }

    /// Delete a tenant profile. Its counters are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::TenantNotFound` if it does not exist.
    pub async fn delete_tenant(&self, id: &str) -> Result<()> {
        if !self.storage.delete_tenant(id).await? {
            return Err(AppError::TenantNotFound(id.to_string()));
        }
        tracing::info!(tenant = %id, "Tenant deleted");
        Ok(())
    }

    /// List tenants whose ID starts with `prefix`, after cursor `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list_tenants(
        &self,
        prefix: Option<&str>,
        from: Option<&str>,
        size: usize,
    ) -> Result<TenantPage> {
        let mut items = self.storage.list_tenants().await?;
        items.sort_by(|a, b| a.id.cmp(&b.id));

        if let Some(prefix) = prefix {
            items.retain(|p| p.id.starts_with(prefix));
        }

        if let Some(from) = from {
            items.retain(|p| p.id.as_str() > from);
        }

        let has_more = items.len() > size;
        items.truncate(size);

        let next_cursor = if has_more {
            items.last().map(|p| p.id.clone())
        } else {
            None
        };

        Ok(TenantPage {
            items,
            next_cursor,
            has_more,
        })
    }

    /// Settings used when no tenant is given. Empty if never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_global(&self) -> Result<TenantSettings> {
        Ok(self
            .storage
            .get_global_settings()
            .await?
            .unwrap_or_default())
    }

    /// Replace the global settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidConfig` if any format is invalid.
    pub async fn save_global(&self, settings: TenantSettings) -> Result<TenantSettings> {
        settings.validate().map_err(AppError::InvalidConfig)?;
        self.storage.save_global_settings(&settings).await?;
        tracing::info!(formats = settings.id_formats.len(), "Global settings saved");
        Ok(settings)
    }
}
