//! Review route handlers

use super::{parse_id, AppJson};
use crate::aggregates::refresh_average_rating;
use crate::auth::{ensure_owner, require_role, CurrentUser, Role};
use crate::db::{repository, Collection};
use crate::error::ApiResult;
use crate::models::{
    Bootcamp, CreateReviewRequest, Empty, Review, SuccessResponse, UpdateReviewRequest,
};
use crate::query::{
    advanced_results, populate, AdvancedResults, Filter, QueryRequest, BOOTCAMP_SUMMARY,
};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::Value;
use tracing::info;
use validator::Validate;

const REVIEWERS: [Role; 2] = [Role::User, Role::Admin];

/// GET /api/v1/reviews
pub async fn list_reviews(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<AdvancedResults>> {
    let request = QueryRequest::from_pairs(&pairs)?;
    let results = advanced_results(
        state.store.as_ref(),
        Collection::Reviews,
        &request,
        None,
        Some(&BOOTCAMP_SUMMARY),
    )
    .await?;
    Ok(Json(results))
}

/// GET /api/v1/bootcamps/{id}/reviews
pub async fn list_bootcamp_reviews(
    State(state): State<SharedState>,
    Path(bootcamp_id): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<AdvancedResults>> {
    let bootcamp_id = parse_id::<Bootcamp>(&bootcamp_id)?;
    let request = QueryRequest::from_pairs(&pairs)?;
    let results = advanced_results(
        state.store.as_ref(),
        Collection::Reviews,
        &request,
        Some(Filter::eq("bootcamp", bootcamp_id.to_string())),
        None,
    )
    .await?;
    Ok(Json(results))
}

/// GET /api/v1/reviews/{id}
pub async fn get_review(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<Value>>> {
    let store = state.store.as_ref();
    let review = repository::get::<Review>(store, parse_id::<Review>(&id)?).await?;

    let mut doc = repository::to_document(&review)?;
    populate(store, std::slice::from_mut(&mut doc), &BOOTCAMP_SUMMARY).await?;
    Ok(Json(SuccessResponse::with_data(doc)))
}

/// POST /api/v1/bootcamps/{id}/reviews
///
/// One review per user and bootcamp; a second attempt is a duplicate key.
pub async fn create_review(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(bootcamp_id): Path<String>,
    AppJson(payload): AppJson<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Review>>)> {
    require_role(&caller, &REVIEWERS)?;
    payload.validate()?;

    let store = state.store.as_ref();
    let bootcamp = repository::get::<Bootcamp>(store, parse_id::<Bootcamp>(&bootcamp_id)?).await?;

    let review = repository::insert(store, &payload.into_review(bootcamp.id, caller.id)).await?;
    refresh_average_rating(store, bootcamp.id).await?;
    info!("Review created: {} (bootcamp: {})", review.id, bootcamp.id);

    Ok((StatusCode::CREATED, Json(SuccessResponse::with_data(review))))
}

/// PUT /api/v1/reviews/{id}
pub async fn update_review(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateReviewRequest>,
) -> ApiResult<Json<SuccessResponse<Review>>> {
    require_role(&caller, &REVIEWERS)?;
    payload.validate()?;

    let store = state.store.as_ref();
    let mut review = repository::get::<Review>(store, parse_id::<Review>(&id)?).await?;
    ensure_owner(&review, &caller, "update")?;

    payload.apply(&mut review);
    let review = repository::save(store, &review).await?;
    refresh_average_rating(store, review.bootcamp).await?;

    Ok(Json(SuccessResponse::with_data(review)))
}

/// DELETE /api/v1/reviews/{id}
pub async fn delete_review(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<Empty>>> {
    require_role(&caller, &REVIEWERS)?;

    let store = state.store.as_ref();
    let review = repository::get::<Review>(store, parse_id::<Review>(&id)?).await?;
    ensure_owner(&review, &caller, "delete")?;

    repository::delete(store, &review).await?;
    refresh_average_rating(store, review.bootcamp).await?;
    info!("Review deleted: {}", review.id);

    Ok(Json(SuccessResponse::with_data(Empty::default())))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn review(rating: u8) -> Value {
        json!({ "title": "Solid", "text": "Would attend again", "rating": rating })
    }

    async fn setup() -> (TestApp, String) {
        let app = TestApp::new();
        let publisher = app.register("Pub", "publisher").await;
        let camp = app.create_bootcamp(&publisher, "Reviewed Camp").await;
        (app, camp)
    }

    #[tokio::test]
    async fn test_reviews_drive_average_rating() {
        let (app, camp) = setup().await;
        let nested = format!("/api/v1/bootcamps/{}/reviews", camp);
        let alice = app.register("Alice", "user").await;
        let bob = app.register("Bob", "user").await;

        let (status, body) = app.request(Method::POST, &nested, Some(&alice), Some(review(8))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["bootcamp"], camp.as_str());
        app.request(Method::POST, &nested, Some(&bob), Some(review(5))).await;

        let (_, body) = app.get(&format!("/api/v1/bootcamps/{}", camp), None).await;
        assert_eq!(body["data"]["averageRating"], 6.5);

        let (_, body) = app.get(&format!("{}?sort=-rating", nested), None).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["rating"], 8);
    }

    #[tokio::test]
    async fn test_one_review_per_bootcamp() {
        let (app, camp) = setup().await;
        let nested = format!("/api/v1/bootcamps/{}/reviews", camp);
        let alice = app.register("Alice", "user").await;

        app.request(Method::POST, &nested, Some(&alice), Some(review(7))).await;
        let (status, body) = app.request(Method::POST, &nested, Some(&alice), Some(review(9))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Duplicate field value entered");
    }

    #[tokio::test]
    async fn test_publishers_cannot_review() {
        let (app, camp) = setup().await;
        let publisher = app.register("Writer", "publisher").await;
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/v1/bootcamps/{}/reviews", camp),
                Some(&publisher),
                Some(review(10)),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_only_author_edits() {
        let (app, camp) = setup().await;
        let alice = app.register("Alice", "user").await;
        let mallory = app.register("Mallory", "user").await;
        let (_, body) = app
            .request(
                Method::POST,
                &format!("/api/v1/bootcamps/{}/reviews", camp),
                Some(&alice),
                Some(review(4)),
            )
            .await;
        let uri = format!("/api/v1/reviews/{}", body["data"]["id"].as_str().unwrap());

        let (status, body) = app.request(Method::DELETE, &uri, Some(&mallory), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().ends_with("is not authorized to delete this review"));

        let (status, body) = app.get(&uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rating"], 4);
        assert_eq!(body["data"]["bootcamp"]["name"], "Reviewed Camp");

        let (status, body) = app
            .request(Method::PUT, &uri, Some(&alice), Some(json!({ "rating": 2 })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rating"], 2);

        let admin = app.make_admin("Root").await;
        let (status, _) = app.request(Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.get(&format!("/api/v1/bootcamps/{}", camp), None).await;
        assert!(body["data"]["averageRating"].is_null());
    }

    #[tokio::test]
    async fn test_missing_review() {
        let (app, _) = setup().await;
        let alice = app.register("Alice", "user").await;
        let id = uuid::Uuid::new_v4();
        let (status, body) = app
            .request(Method::DELETE, &format!("/api/v1/reviews/{}", id), Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], format!("Review not found with id of {}", id));
    }
}
