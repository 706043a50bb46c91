//! Course route handlers
//!
//! Course writes recompute the parent bootcamp's average cost.

use super::{parse_id, AppJson};
use crate::aggregates::refresh_average_cost;
use crate::auth::{ensure_owner, require_role, CurrentUser, Role};
use crate::db::{repository, Collection};
use crate::error::ApiResult;
use crate::models::{
    Bootcamp, Course, CreateCourseRequest, Empty, SuccessResponse, UpdateCourseRequest,
};
use crate::query::{
    advanced_results, populate, AdvancedResults, Filter, QueryRequest, COURSE_BOOTCAMP,
};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::Value;
use tracing::info;
use validator::Validate;

const PUBLISHERS: [Role; 2] = [Role::Publisher, Role::Admin];

/// GET /api/v1/courses
pub async fn list_courses(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<AdvancedResults>> {
    let request = QueryRequest::from_pairs(&pairs)?;
    let results = advanced_results(
        state.store.as_ref(),
        Collection::Courses,
        &request,
        None,
        Some(&COURSE_BOOTCAMP),
    )
    .await?;
    Ok(Json(results))
}

/// GET /api/v1/bootcamps/{id}/courses
pub async fn list_bootcamp_courses(
    State(state): State<SharedState>,
    Path(bootcamp_id): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<AdvancedResults>> {
    let bootcamp_id = parse_id::<Bootcamp>(&bootcamp_id)?;
    let request = QueryRequest::from_pairs(&pairs)?;
    let scope = Filter::eq("bootcamp", bootcamp_id.to_string());
    let results = advanced_results(
        state.store.as_ref(),
        Collection::Courses,
        &request,
        Some(scope),
        None,
    )
    .await?;
    Ok(Json(results))
}

/// GET /api/v1/courses/{id}
pub async fn get_course(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<Value>>> {
    let store = state.store.as_ref();
    let course = repository::get::<Course>(store, parse_id::<Course>(&id)?).await?;

    let mut doc = repository::to_document(&course)?;
    populate(store, std::slice::from_mut(&mut doc), &COURSE_BOOTCAMP).await?;
    Ok(Json(SuccessResponse::with_data(doc)))
}

/// POST /api/v1/bootcamps/{id}/courses
///
/// Only the owner of the bootcamp (or an admin) may add courses to it.
pub async fn create_course(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(bootcamp_id): Path<String>,
    AppJson(payload): AppJson<CreateCourseRequest>,
) -> ApiResult<Json<SuccessResponse<Course>>> {
    require_role(&caller, &PUBLISHERS)?;
    payload.validate()?;

    let store = state.store.as_ref();
    let bootcamp = repository::get::<Bootcamp>(store, parse_id::<Bootcamp>(&bootcamp_id)?).await?;
    ensure_owner(&bootcamp, &caller, "add a course to")?;

    let course = repository::insert(store, &payload.into_course(bootcamp.id, caller.id)).await?;
    refresh_average_cost(store, bootcamp.id).await?;
    info!("Course created: {} (bootcamp: {})", course.id, bootcamp.id);

    Ok(Json(SuccessResponse::with_data(course)))
}

/// PUT /api/v1/courses/{id}
pub async fn update_course(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateCourseRequest>,
) -> ApiResult<Json<SuccessResponse<Course>>> {
    require_role(&caller, &PUBLISHERS)?;
    payload.validate()?;

    let store = state.store.as_ref();
    let mut course = repository::get::<Course>(store, parse_id::<Course>(&id)?).await?;
    ensure_owner(&course, &caller, "update")?;

    payload.apply(&mut course);
    let course = repository::save(store, &course).await?;
    refresh_average_cost(store, course.bootcamp).await?;
    info!("Course updated: {}", course.id);

    Ok(Json(SuccessResponse::with_data(course)))
}

/// DELETE /api/v1/courses/{id}
pub async fn delete_course(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<Empty>>> {
    require_role(&caller, &PUBLISHERS)?;

    let store = state.store.as_ref();
    let course = repository::get::<Course>(store, parse_id::<Course>(&id)?).await?;
    ensure_owner(&course, &caller, "delete")?;

    repository::delete(store, &course).await?;
    refresh_average_cost(store, course.bootcamp).await?;
    info!("Course deleted: {}", course.id);

    Ok(Json(SuccessResponse::with_data(Empty::default())))
}
