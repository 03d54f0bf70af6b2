use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::response::ApiError;
use crate::upload;
use crate::AppState;

/// Serve a locally stored upload.
/// Route: GET /uploads/:filename
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    // Stored names use the sanitizer's character set only; anything outside
    // it, or a bare dot sequence addressing a directory, cannot exist here
    // and must not reach the filesystem.
    if !upload::is_safe_filename(&filename) {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let path = std::path::Path::new(&state.config.storage.uploads_dir).join(&filename);
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => {
            tracing::error!(error = %e, filename = %filename, "Failed to read stored file");
            return Err(ApiError::internal("Failed to read file"));
        }
    };

    let mime_type = mime_guess::from_path(&filename).first_or_octet_stream();

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        mime_type
            .as_ref()
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    // Stored names are unique and contents immutable, so caching is safe.
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
