//! Application state for Axum handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;
use crate::service::{IdGenerator, SettingsService};
use crate::storage::traits::Storage;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Storage backend.
    pub storage: Arc<dyn Storage>,
    /// ID generator.
    pub generator: Arc<IdGenerator>,
    /// Tenant and global settings.
    pub settings_service: Arc<SettingsService>,
    /// Prometheus recorder handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: Arc<AppConfig>, storage: Arc<dyn Storage>) -> Self {
        let generator = Arc::new(IdGenerator::new(Arc::clone(&storage), &config.counter));
        let settings_service = Arc::new(SettingsService::new(Arc::clone(&storage)));

        Self {
            config,
            storage,
            generator,
            settings_service,
            metrics: None,
        }
    }

    /// Attach the Prometheus handle used by `GET /metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
