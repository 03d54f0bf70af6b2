use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::upload::MAX_FILE_SIZE;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Twice the accepted file size: multipart framing must never make the
    // transport reject a body the validator is supposed to refuse itself.
    let body_limit = DefaultBodyLimit::max(2 * MAX_FILE_SIZE as usize);

    let allowed_origin = state
        .config
        .server
        .frontend_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000"));

    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/api/upload", post(handlers::upload_image).layer(body_limit))
        .route("/api/upload", get(handlers::list_uploads))
        .route("/api/upload/:filename", delete(handlers::delete_upload))
        .route("/uploads/:filename", get(handlers::serve_upload))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
