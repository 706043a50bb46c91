//! Authentication route handlers
//!
//! Registration, login and logout, the caller's own account, and the
//! forgot/reset password flow. Successful sign-ins answer with the token in
//! the body and in an http-only cookie.

use super::AppJson;
use crate::auth::{
    generate_reset_token, hash_password, hash_reset_token, verify_password, CurrentUser,
    TOKEN_COOKIE,
};
use crate::db::repository;
use crate::error::{ApiResult, AppError};
use crate::mailer::password_reset_message;
use crate::models::{
    now, Empty, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    SuccessResponse, UpdateDetailsRequest, UpdatePasswordRequest, User, UserResponse,
};
use crate::query::Filter;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

/// Reset tokens are valid for ten minutes
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// How long the cleared cookie lingers after logout
const LOGOUT_COOKIE_SECONDS: i64 = 10;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

type TokenReply = (StatusCode, CookieJar, Json<TokenResponse>);

/// Sign a token for `user` and set it both as a cookie and in the body
fn send_token_response(
    state: &SharedState,
    jar: CookieJar,
    user: &User,
    status: StatusCode,
) -> ApiResult<TokenReply> {
    let token = state.jwt.issue(user.id, user.role)?;
    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::days(state.settings.jwt.cookie_expire_days))
        .secure(state.settings.is_production());

    Ok((
        status,
        jar.add(cookie),
        Json(TokenResponse {
            success: true,
            token,
        }),
    ))
}

fn by_email(email: &str) -> Filter {
    Filter::eq("email", email.to_lowercase())
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<SharedState>,
    jar: CookieJar,
    AppJson(payload): AppJson<RegisterRequest>,
) -> ApiResult<TokenReply> {
    payload.validate()?;

    let password = hash_password(payload.password.as_deref().unwrap_or_default())?;
    let user = User::new(
        payload.name.unwrap_or_default(),
        payload.email.unwrap_or_default(),
        payload.role.unwrap_or_default(),
        password,
    );
    let user = repository::insert(state.store.as_ref(), &user).await?;
    info!("User registered: {} ({})", user.email, user.role);

    send_token_response(&state, jar, &user, StatusCode::OK)
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<TokenReply> {
    payload.validate()?;
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let user = repository::find_one::<User>(state.store.as_ref(), &by_email(&email))
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&password, &user.password)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    info!("User logged in: {}", user.email);
    send_token_response(&state, jar, &user, StatusCode::OK)
}

/// GET /api/v1/auth/logout
///
/// Overwrites the token cookie with `none`; bearer tokens stay valid until
/// they expire.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<SuccessResponse<Empty>>) {
    let cookie = Cookie::build((TOKEN_COOKIE, "none"))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::seconds(LOGOUT_COOKIE_SECONDS));

    (
        jar.add(cookie),
        Json(SuccessResponse::with_data(Empty::default())),
    )
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
) -> ApiResult<Json<SuccessResponse<UserResponse>>> {
    let user = repository::get::<User>(state.store.as_ref(), caller.id).await?;
    Ok(Json(SuccessResponse::with_data(user.into())))
}

/// PUT /api/v1/auth/updatedetails
///
/// Only name and email can be changed here.
pub async fn update_details(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    AppJson(payload): AppJson<UpdateDetailsRequest>,
) -> ApiResult<Json<SuccessResponse<UserResponse>>> {
    payload.validate()?;

    let store = state.store.as_ref();
    let mut user = repository::get::<User>(store, caller.id).await?;
    if let Some(name) = payload.name {
        user.name = name;
    }
    if let Some(email) = payload.email {
        user.email = email.to_lowercase();
    }

    let user = repository::save(store, &user).await?;
    Ok(Json(SuccessResponse::with_data(user.into())))
}

/// PUT /api/v1/auth/updatepassword
pub async fn update_password(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    jar: CookieJar,
    AppJson(payload): AppJson<UpdatePasswordRequest>,
) -> ApiResult<TokenReply> {
    payload.validate()?;

    let store = state.store.as_ref();
    let mut user = repository::get::<User>(store, caller.id).await?;
    let current = payload.current_password.unwrap_or_default();
    if !verify_password(&current, &user.password)? {
        return Err(AppError::Unauthorized("Password is incorrect".to_string()));
    }

    user.password = hash_password(payload.new_password.as_deref().unwrap_or_default())?;
    let user = repository::save(store, &user).await?;
    info!("Password updated for user {}", user.id);

    send_token_response(&state, jar, &user, StatusCode::OK)
}

/// Absolute reset link built from the request's own scheme and host
fn reset_url(headers: &HeaderMap, state: &SharedState, token: &str) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", state.settings.server.port));
    format!("{}://{}/api/v1/auth/resetpassword/{}", proto, host, token)
}

/// POST /api/v1/auth/forgotpassword
///
/// Stores the digest of a fresh reset token and mails the raw token. A failed
/// send withdraws the token again.
pub async fn forgot_password(
    State(state): State<SharedState>,
    headers: HeaderMap,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> ApiResult<Json<SuccessResponse<String>>> {
    payload.validate()?;
    let email = payload.email.unwrap_or_default();

    let store = state.store.as_ref();
    let mut user = repository::find_one::<User>(store, &by_email(&email))
        .await?
        .ok_or_else(|| AppError::NotFound("There is no user with that email".to_string()))?;

    let (token, digest) = generate_reset_token();
    user.reset_password_token = Some(digest);
    user.reset_password_expire = Some(now() + chrono::Duration::minutes(RESET_TOKEN_TTL_MINUTES));
    let mut user = repository::save(store, &user).await?;

    let message = password_reset_message(&user.email, &reset_url(&headers, &state, &token));
    if let Err(e) = state.mailer.send(message).await {
        warn!("Reset mail to {} failed: {}", user.email, e);
        user.clear_reset_token();
        repository::save(store, &user).await?;
        return Err(e.into());
    }

    Ok(Json(SuccessResponse::with_data("Email sent".to_string())))
}

/// PUT /api/v1/auth/resetpassword/{resettoken}
pub async fn reset_password(
    State(state): State<SharedState>,
    Path(reset_token): Path<String>,
    jar: CookieJar,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> ApiResult<TokenReply> {
    payload.validate()?;

    let store = state.store.as_ref();
    let filter = Filter::eq("resetPasswordToken", hash_reset_token(&reset_token));
    let mut user = repository::find_one::<User>(store, &filter)
        .await?
        .filter(|user| user.reset_password_expire.is_some_and(|at| at > now()))
        .ok_or_else(|| AppError::BadRequest("Invalid token".to_string()))?;

    user.password = hash_password(payload.password.as_deref().unwrap_or_default())?;
    user.clear_reset_token();
    let user = repository::save(store, &user).await?;
    info!("Password reset for user {}", user.id);

    send_token_response(&state, jar, &user, StatusCode::OK)
}
