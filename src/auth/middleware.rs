//! Authentication middleware
//!
//! Extracts and validates JWT tokens from requests and attaches the caller.

use crate::auth::{CurrentUser, Role};
use crate::db::repository;
use crate::error::AppError;
use crate::models::User;
use crate::state::SharedState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use tracing::debug;

pub const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// Cookie carrying the token for browser clients
pub const TOKEN_COOKIE: &str = "token";

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Require a valid token (bearer header first, then the `token` cookie) whose
/// user still exists, and insert [`CurrentUser`] into the request extensions.
pub async fn protect(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)
        .or_else(|| {
            jar.get(TOKEN_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|v| v != "none")
        })
        .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

    let claims = state.jwt.verify(&token).map_err(|e| {
        debug!("Rejected token: {}", e);
        AppError::Unauthorized(NOT_AUTHORIZED.to_string())
    })?;

    let user = repository::find_by_id::<User>(state.store.as_ref(), claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Require one of `allowed` roles
pub fn require_role(caller: &CurrentUser, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&caller.role) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "User role {} is not authorized to access this route",
        caller.role
    )))
}
