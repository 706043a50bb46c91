//! Route definitions and router setup
//!
//! Configures all API routes and middleware. Read-only listing routes are
//! public; everything that mutates, plus the account and user routes, sits
//! behind [`protect`].

mod auth;
mod bootcamps;
mod courses;
mod reviews;
mod users;

use crate::auth::protect;
use crate::error::AppError;
use crate::models::Resource;
use crate::state::SharedState;
use axum::{
    extract::{DefaultBodyLimit, FromRequest},
    http::{header, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;
use uuid::Uuid;

/// Headroom for multipart framing on top of the configured upload size
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// JSON body extractor whose rejections use the API error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Parse a path id; malformed ids read as missing resources
pub fn parse_id<R: Resource>(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| crate::db::repository::missing::<R>(raw))
}

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(&state.settings.cors.allowed_origins);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    let upload_limit = DefaultBodyLimit::max(state.settings.upload.max_size + MULTIPART_OVERHEAD);

    let public = Router::new()
        .route("/bootcamps", get(bootcamps::list_bootcamps))
        .route("/bootcamps/{id}", get(bootcamps::get_bootcamp))
        .route(
            "/bootcamps/radius/{lat}/{lng}/{distance}",
            get(bootcamps::bootcamps_in_radius),
        )
        .route("/bootcamps/{id}/courses", get(courses::list_bootcamp_courses))
        .route("/bootcamps/{id}/reviews", get(reviews::list_bootcamp_reviews))
        .route("/courses", get(courses::list_courses))
        .route("/courses/{id}", get(courses::get_course))
        .route("/reviews", get(reviews::list_reviews))
        .route("/reviews/{id}", get(reviews::get_review))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/forgotpassword", post(auth::forgot_password))
        .route("/auth/resetpassword/{resettoken}", put(auth::reset_password));

    let protected = Router::new()
        .route("/bootcamps", post(bootcamps::create_bootcamp))
        .route(
            "/bootcamps/{id}",
            put(bootcamps::update_bootcamp).delete(bootcamps::delete_bootcamp),
        )
        .route(
            "/bootcamps/{id}/photo",
            put(bootcamps::upload_photo).layer(upload_limit),
        )
        .route("/bootcamps/{id}/courses", post(courses::create_course))
        .route(
            "/courses/{id}",
            put(courses::update_course).delete(courses::delete_course),
        )
        .route("/bootcamps/{id}/reviews", post(reviews::create_review))
        .route(
            "/reviews/{id}",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/auth/me", get(auth::me))
        .route("/auth/updatedetails", put(auth::update_details))
        .route("/auth/updatepassword", put(auth::update_password))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(from_fn_with_state(state.clone(), protect));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", public.merge(protected))
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from the configured origins
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<_> = allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    cors.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
