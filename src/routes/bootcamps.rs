//! Bootcamp route handlers
//!
//! Listing, CRUD, radius search and photo upload. Deleting a bootcamp also
//! removes its courses and reviews.

use super::{parse_id, AppJson};
use crate::auth::{ensure_owner, require_role, CurrentUser, Role};
use crate::db::{repository, Collection, FindOptions};
use crate::error::{validation_error, ApiResult, AppError};
use crate::models::{
    Bootcamp, CreateBootcampRequest, Empty, ListResponse, SuccessResponse, UpdateBootcampRequest,
};
use crate::query::{advanced_results, AdvancedResults, Filter, GeoWithin, QueryRequest};
use crate::state::SharedState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use validator::Validate;

const PUBLISHERS: [Role; 2] = [Role::Publisher, Role::Admin];

/// Earth radius in miles and kilometres
const EARTH_RADIUS_MI: f64 = 3963.0;
const EARTH_RADIUS_KM: f64 = 6378.0;

/// GET /api/v1/bootcamps
pub async fn list_bootcamps(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<AdvancedResults>> {
    let request = QueryRequest::from_pairs(&pairs)?;
    let results =
        advanced_results(state.store.as_ref(), Collection::Bootcamps, &request, None, None).await?;
    Ok(Json(results))
}

/// GET /api/v1/bootcamps/{id}
pub async fn get_bootcamp(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<Bootcamp>>> {
    let id = parse_id::<Bootcamp>(&id)?;
    let bootcamp = repository::get::<Bootcamp>(state.store.as_ref(), id).await?;
    Ok(Json(SuccessResponse::with_data(bootcamp)))
}

/// POST /api/v1/bootcamps
///
/// Publishers may own a single bootcamp; admins any number.
pub async fn create_bootcamp(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    AppJson(payload): AppJson<CreateBootcampRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Bootcamp>>)> {
    require_role(&caller, &PUBLISHERS)?;
    payload.validate()?;

    let store = state.store.as_ref();
    if !caller.is_admin() {
        let owned = store
            .count(Collection::Bootcamps, &Filter::eq("user", caller.id.to_string()))
            .await?;
        if owned > 0 {
            return Err(AppError::BadRequest(format!(
                "The user with ID {} has already published a bootcamp",
                caller.id
            )));
        }
    }

    let bootcamp = repository::insert(store, &payload.into_bootcamp(caller.id)).await?;
    info!("Bootcamp created: {} (id: {})", bootcamp.name, bootcamp.id);

    Ok((StatusCode::CREATED, Json(SuccessResponse::with_data(bootcamp))))
}

/// PUT /api/v1/bootcamps/{id}
pub async fn update_bootcamp(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateBootcampRequest>,
) -> ApiResult<Json<SuccessResponse<Bootcamp>>> {
    require_role(&caller, &PUBLISHERS)?;
    payload.validate()?;

    let store = state.store.as_ref();
    let mut bootcamp = repository::get::<Bootcamp>(store, parse_id::<Bootcamp>(&id)?).await?;
    ensure_owner(&bootcamp, &caller, "update")?;

    payload.apply(&mut bootcamp);
    let bootcamp = repository::save(store, &bootcamp).await?;
    info!("Bootcamp updated: {}", bootcamp.id);

    Ok(Json(SuccessResponse::with_data(bootcamp)))
}

/// DELETE /api/v1/bootcamps/{id}
pub async fn delete_bootcamp(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<Empty>>> {
    require_role(&caller, &PUBLISHERS)?;

    let store = state.store.as_ref();
    let bootcamp = repository::get::<Bootcamp>(store, parse_id::<Bootcamp>(&id)?).await?;
    ensure_owner(&bootcamp, &caller, "delete")?;

    let children = Filter::eq("bootcamp", bootcamp.id.to_string());
    let courses = store.delete_many(Collection::Courses, &children).await?;
    let reviews = store.delete_many(Collection::Reviews, &children).await?;
    repository::delete(store, &bootcamp).await?;

    info!(
        "Bootcamp deleted: {} ({} courses, {} reviews)",
        bootcamp.id, courses, reviews
    );
    Ok(Json(SuccessResponse::with_data(Empty::default())))
}

#[derive(Debug, Deserialize)]
pub struct RadiusQuery {
    pub unit: Option<String>,
}

fn parse_number(raw: &str, name: &str) -> ApiResult<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| validation_error(format!("Invalid {}: {}", name, raw)))
}

/// GET /api/v1/bootcamps/radius/{lat}/{lng}/{distance}
///
/// Distance is in miles unless `?unit=km`.
pub async fn bootcamps_in_radius(
    State(state): State<SharedState>,
    Path((lat, lng, distance)): Path<(String, String, String)>,
    Query(query): Query<RadiusQuery>,
) -> ApiResult<Json<ListResponse<Value>>> {
    let lat = parse_number(&lat, "latitude")?;
    let lng = parse_number(&lng, "longitude")?;
    let distance = parse_number(&distance, "distance")?;
    if distance < 0.0 {
        return Err(validation_error("Distance can not be negative"));
    }

    let earth_radius = match query.unit.as_deref() {
        None | Some("mi") => EARTH_RADIUS_MI,
        Some("km") => EARTH_RADIUS_KM,
        Some(other) => return Err(validation_error(format!("Unknown unit: {}", other))),
    };

    let filter = Filter::new().within(GeoWithin {
        field: "location.coordinates".to_string(),
        lng,
        lat,
        radius: distance / earth_radius,
    });
    let bootcamps = state
        .store
        .find(Collection::Bootcamps, &FindOptions::new(filter))
        .await?;
    debug!("{} bootcamps within {} of ({}, {})", bootcamps.len(), distance, lat, lng);

    Ok(Json(ListResponse::new(bootcamps)))
}

/// PUT /api/v1/bootcamps/{id}/photo
///
/// Multipart field `file`; stored as `photo_<id><ext>` under the upload path.
pub async fn upload_photo(
    State(state): State<SharedState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<SuccessResponse<String>>> {
    require_role(&caller, &PUBLISHERS)?;

    let store = state.store.as_ref();
    let mut bootcamp = repository::get::<Bootcamp>(store, parse_id::<Bootcamp>(&id)?).await?;
    ensure_owner(&bootcamp, &caller, "update")?;

    let upload = &state.settings.upload;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let is_image = field
            .content_type()
            .map_or(false, |ct| ct.starts_with("image"));
        if !is_image {
            return Err(AppError::BadRequest("Please upload an image file".to_string()));
        }
        let extension = field
            .file_name()
            .and_then(|name| std::path::Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?;
        file = Some((extension, bytes));
        break;
    }

    let (extension, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Please upload a file".to_string()))?;
    if bytes.len() > upload.max_size {
        return Err(AppError::BadRequest(format!(
            "Please upload an image less than {} bytes",
            upload.max_size
        )));
    }

    let file_name = format!("photo_{}{}", bootcamp.id, extension);
    tokio::fs::create_dir_all(&upload.path)
        .await
        .map_err(|e| AppError::Internal(format!("Problem with file upload: {}", e)))?;
    tokio::fs::write(upload.path.join(&file_name), &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Problem with file upload: {}", e)))?;

    bootcamp.photo = file_name.clone();
    repository::save(store, &bootcamp).await?;
    info!("Photo uploaded for bootcamp {}: {}", bootcamp.id, file_name);

    Ok(Json(SuccessResponse::with_data(file_name)))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::TestApp;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_publisher_owns_one_bootcamp() {
        let app = TestApp::new();
        let token = app.register("Pub", "publisher").await;
        app.create_bootcamp(&token, "First Camp").await;

        let (status, body) = app
            .request(
                Method::POST,
                "/api/v1/bootcamps",
                Some(&token),
                Some(json!({
                    "name": "Second Camp",
                    "description": "d",
                    "address": "a",
                    "careers": ["Business"]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("has already published a bootcamp"));

        let admin = app.make_admin("Root").await;
        app.create_bootcamp(&admin, "Admin Camp One").await;
        app.create_bootcamp(&admin, "Admin Camp Two").await;
    }

    #[tokio::test]
    async fn test_user_role_cannot_create() {
        let app = TestApp::new();
        let token = app.register("Camper", "user").await;
        let (status, body) = app
            .request(Method::POST, "/api/v1/bootcamps", Some(&token), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "User role user is not authorized to access this route");
    }

    #[tokio::test]
    async fn test_duplicate_name_and_validation() {
        let app = TestApp::new();
        let one = app.register("One", "publisher").await;
        let two = app.register("Two", "publisher").await;
        app.create_bootcamp(&one, "Same Name").await;

        let payload = json!({
            "name": "Same Name",
            "description": "d",
            "address": "a",
            "careers": ["Other"]
        });
        let (status, body) = app
            .request(Method::POST, "/api/v1/bootcamps", Some(&two), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Duplicate field value entered");

        let (status, body) = app
            .request(Method::POST, "/api/v1/bootcamps", Some(&two), Some(json!({ "name": "x" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Please add a description"));
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let app = TestApp::new();
        let admin = app.make_admin("Root").await;
        for name in ["Alpha Camp", "Bravo Camp", "Charlie Camp"] {
            app.create_bootcamp(&admin, name).await;
        }

        let (status, body) = app
            .get("/api/v1/bootcamps?select=name&sort=name&limit=2", None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["name"], "Alpha Camp");
        assert!(body["data"][0].get("address").is_none());
        assert_eq!(body["pagination"], json!({ "next": { "page": 2, "limit": 2 } }));

        let (status, body) = app.get("/api/v1/bootcamps?careers%5Bin%5D=Business", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let (status, body) = app.get("/api/v1/bootcamps?averageCost%5Bbetween%5D=1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_update_and_delete_gate() {
        let app = TestApp::new();
        let owner = app.register("Owner", "publisher").await;
        let other = app.register("Other", "publisher").await;
        let id = app.create_bootcamp(&owner, "Gated Camp").await;
        let uri = format!("/api/v1/bootcamps/{}", id);

        let (status, _) = app
            .request(Method::PUT, &uri, Some(&other), Some(json!({ "housing": true })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (_, body) = app.get(&uri, None).await;
        assert_eq!(body["data"]["housing"], false);

        let (status, body) = app
            .request(Method::PUT, &uri, Some(&owner), Some(json!({ "name": "Renamed Camp" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slug"], "renamed-camp");

        let (status, _) = app.request(Method::DELETE, &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app.request(Method::DELETE, &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "data": {} }));

        let (status, body) = app.get(&uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], format!("Bootcamp not found with id of {}", id));
    }

    #[tokio::test]
    async fn test_malformed_id_is_not_found() {
        let app = TestApp::new();
        let (status, body) = app.get("/api/v1/bootcamps/5d713995b721c3bb38c1f5d0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Bootcamp not found with id of 5d713995b721c3bb38c1f5d0");
    }

    #[tokio::test]
    async fn test_radius_search() {
        let app = TestApp::new();
        let token = app.register("Pub", "publisher").await;
        app.create_bootcamp(&token, "Boston Camp").await;

        // Cambridge MA is a couple of miles from the Boston campus
        let (status, body) = app.get("/api/v1/bootcamps/radius/42.3736/-71.1097/10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        // New York is ~190 miles away
        let (_, body) = app.get("/api/v1/bootcamps/radius/40.7128/-74.0060/100", None).await;
        assert_eq!(body["count"], 0);
        let (_, body) = app.get("/api/v1/bootcamps/radius/40.7128/-74.0060/400?unit=km", None).await;
        assert_eq!(body["count"], 1);

        let (status, _) = app.get("/api/v1/bootcamps/radius/north/-74.0/10", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    fn multipart_request(uri: &str, token: &str, content_type: &str, payload: &[u8]) -> Request<Body> {
        let boundary = "devcamperboundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"camp.jpg\"\r\n\
                 Content-Type: {ct}\r\n\r\n",
                b = boundary,
                ct = content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_photo_upload() {
        let app = TestApp::new();
        let token = app.register("Pub", "publisher").await;
        let id = app.create_bootcamp(&token, "Photo Camp").await;
        let uri = format!("/api/v1/bootcamps/{}/photo", id);

        let response = app
            .router
            .clone()
            .oneshot(multipart_request(&uri, &token, "text/plain", b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .router
            .clone()
            .oneshot(multipart_request(&uri, &token, "image/jpeg", b"\xff\xd8\xff\xe0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let expected = format!("photo_{}.jpg", id);
        let stored = app.state.settings.upload.path.join(&expected);
        assert_eq!(std::fs::read(&stored).unwrap(), b"\xff\xd8\xff\xe0");

        let (_, body) = app.get(&format!("/api/v1/bootcamps/{}", id), None).await;
        assert_eq!(body["data"]["photo"], expected);
        let _ = std::fs::remove_dir_all(&app.state.settings.upload.path);
    }
}
