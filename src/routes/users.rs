//! User administration handlers
//!
//! Admin only. Responses use [`UserResponse`] so hashes never leave the API.

use super::{parse_id, AppJson};
use crate::auth::{hash_password, require_role, CurrentUser, Role};
use crate::db::{repository, Collection};
use crate::error::ApiResult;
use crate::models::{
    CreateUserRequest, Empty, SuccessResponse, UpdateUserRequest, User, UserResponse,
};
use crate::query::{advanced_results, AdvancedResults, QueryRequest};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use validator::Validate;

const ADMINS: [Role; 1] = [Role::Admin];

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<AdvancedResults>> {
    require_role(&caller, &ADMINS)?;
    let request = QueryRequest::from_pairs(&pairs)?;
    let results =
        advanced_results(state.store.as_ref(), Collection::Users, &request, None, None).await?;
    Ok(Json(results))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<UserResponse>>> {
    require_role(&caller, &ADMINS)?;
    let user = repository::get::<User>(state.store.as_ref(), parse_id::<User>(&id)?).await?;
    Ok(Json(SuccessResponse::with_data(user.into())))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<UserResponse>>)> {
    require_role(&caller, &ADMINS)?;
    payload.validate()?;

    let password = hash_password(payload.password.as_deref().unwrap_or_default())?;
    let user = User::new(
        payload.name.unwrap_or_default(),
        payload.email.unwrap_or_default(),
        payload.role.unwrap_or_default(),
        password,
    );
    let user = repository::insert(state.store.as_ref(), &user).await?;
    info!("User created by admin {}: {}", caller.id, user.id);

    Ok((StatusCode::CREATED, Json(SuccessResponse::with_data(user.into()))))
}

/// PUT /api/v1/users/{id}
pub async fn update_user(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> ApiResult<Json<SuccessResponse<UserResponse>>> {
    require_role(&caller, &ADMINS)?;
    payload.validate()?;

    let store = state.store.as_ref();
    let mut user = repository::get::<User>(store, parse_id::<User>(&id)?).await?;
    if let Some(name) = payload.name {
        user.name = name;
    }
    if let Some(email) = payload.email {
        user.email = email.to_lowercase();
    }
    if let Some(role) = payload.role {
        user.role = role;
    }
    if let Some(password) = payload.password {
        user.password = hash_password(&password)?;
    }

    let user = repository::save(store, &user).await?;
    Ok(Json(SuccessResponse::with_data(user.into())))
}

/// DELETE /api/v1/users/{id}
pub async fn delete_user(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<Empty>>> {
    require_role(&caller, &ADMINS)?;

    let store = state.store.as_ref();
    let user = repository::get::<User>(store, parse_id::<User>(&id)?).await?;
    repository::delete(store, &user).await?;
    info!("User deleted by admin {}: {}", caller.id, user.id);

    Ok(Json(SuccessResponse::with_data(Empty::default())))
}
