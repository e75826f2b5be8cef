//! Authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::state::AppState;
use crate::config::AuthConfig;
use crate::error::AppError;

/// Caller role established by a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Settings and counter administration.
    Admin,
    /// ID generation only.
    Client,
}

/// Extract bearer token from Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth_header = headers.get(AUTHORIZATION)?.to_str().ok()?;

    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Role granted by `token`, if any.
fn role_for(auth: &AuthConfig, token: &str) -> Option<Role> {
    if token == auth.admin_token {
        Some(Role::Admin)
    } else if auth.api_tokens.iter().any(|t| t == token) {
        Some(Role::Client)
    } else {
        None
    }
}

fn authenticate(state: &AppState, req: &Request<Body>) -> Result<Role, AppError> {
    let token = extract_bearer_token(req.headers())
        .ok_or(AppError::Unauthorized("Missing or invalid Authorization header"))?;

    role_for(&state.config.auth, token).ok_or(AppError::Unauthorized("Invalid token"))
}

/// Middleware that requires the admin token.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let role = match authenticate(&state, &req) {
        Ok(Role::Admin) => Role::Admin,
        Ok(Role::Client) => return AppError::Forbidden("Admin token required").into_response(),
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(role);
    next.run(req).await
}

/// Middleware that requires an API token. The admin token is accepted too.
pub async fn require_key(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let role = match authenticate(&state, &req) {
        Ok(role) => role,
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(role);
    next.run(req).await
}
