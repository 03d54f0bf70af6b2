use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::response::ApiError;
use crate::pipeline::IncomingFile;
use crate::storage::StoredFile;
use crate::AppState;

/// One stored file as presented to API clients.
#[derive(Debug, Serialize)]
pub struct FileInfo {
    pub filename: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: FileInfo,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

impl From<StoredFile> for FileInfo {
    fn from(stored: StoredFile) -> Self {
        FileInfo {
            filename: stored.key,
            display_name: stored.display_name,
            url: stored.url,
        }
    }
}

/// Upload a single image sent as the multipart field `image`.
/// Route: POST /api/upload
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<IncomingFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        // Single file per request; other fields are ignored.
        if field.name() != Some("image") || file.is_some() {
            continue;
        }

        // A part without a filename is a plain form value, not a file.
        let Some(original_name) = field.file_name().map(|name| name.to_string()) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

        file = Some(IncomingFile {
            size: data.len() as u64,
            bytes: data,
            original_name,
            content_type,
        });
    }

    let stored = state.pipeline.handle_upload(file).await?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully!".to_string(),
        file: stored.into(),
    }))
}

/// List every stored file visible on the active backend.
/// Route: GET /api/upload
pub async fn list_uploads(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse>, ApiError> {
    let files = state.pipeline.handle_list().await?;

    Ok(Json(ListResponse {
        files: files.into_iter().map(FileInfo::from).collect(),
    }))
}

/// Delete a stored file by name.
/// Route: DELETE /api/upload/:filename
pub async fn delete_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.pipeline.handle_delete(&filename).await?;

    Ok(Json(DeleteResponse {
        message: "File deleted successfully".to_string(),
    }))
}
