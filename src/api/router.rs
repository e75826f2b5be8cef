//! Router setup and configuration.

use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::handlers::{config, counter, health, id};
use crate::api::middleware::auth::{require_admin, require_key};
use crate::api::state::AppState;

/// Header carrying the per-request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    // Health and metrics routes (no auth required)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics));

    // Settings routes (admin auth required)
    let config_routes = Router::new()
        .route("/list", get(config::list_tenants))
        .route(
            "/tenant",
            post(config::create_tenant)
                .put(config::update_tenant)
                .get(config::get_tenant)
                .delete(config::delete_tenant),
        )
        .route("/global", post(config::save_global).get(config::get_global))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Counter administration (admin auth required)
    let counter_routes = Router::new()
        .route("/reset", post(counter::reset))
        .route("/current", get(counter::current))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // ID generation routes (key auth required)
    let id_routes = Router::new()
        .route("/generate", get(id::generate))
        .layer(middleware::from_fn_with_state(state.clone(), require_key));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(Any);

    Router::new()
        .merge(health_routes)
        .nest("/v1/config", config_routes)
        .nest("/v1/counter", counter_routes)
        .nest("/v1/id", id_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(cors),
        )
        .with_state(state)
}
