use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use image_uploader::api;
use image_uploader::config::{Config, ServerConfig, StorageConfig};
use image_uploader::pipeline::{RemoteBackend, UploadPipeline};
use image_uploader::storage::{DiskStore, MediaHost, RemoteError, StoredFile};
use image_uploader::AppState;

const BASE_URL: &str = "http://localhost:5001";
const ORIGIN: &str = "http://localhost:3000";
const BOUNDARY: &str = "x-test-boundary";

/// Media host double that is always unreachable.
struct DownHost;

#[async_trait]
impl MediaHost for DownHost {
    async fn store(&self, _data: Bytes, _original_name: &str) -> Result<StoredFile, RemoteError> {
        Err(RemoteError::Api("host down".to_string()))
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<StoredFile>, RemoteError> {
        Err(RemoteError::Api("host down".to_string()))
    }

    async fn delete(&self, _public_id: &str) -> Result<bool, RemoteError> {
        Err(RemoteError::Api("host down".to_string()))
    }
}

fn test_config(dir: &TempDir) -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            public_base_url: BASE_URL.to_string(),
            frontend_origin: ORIGIN.to_string(),
        },
        storage: StorageConfig {
            uploads_dir: dir.path().join("uploads").to_string_lossy().into_owned(),
            remote: None,
        },
    }
}

fn test_app(dir: &TempDir) -> Router {
    let config = test_config(dir);
    let disk = DiskStore::new(&config.storage.uploads_dir, BASE_URL).unwrap();
    let state = Arc::new(AppState {
        config,
        pipeline: UploadPipeline::new(disk, None),
        started_at: Instant::now(),
    });
    api::create_router(state)
}

fn test_app_with_down_remote(dir: &TempDir) -> Router {
    let config = test_config(dir);
    let disk = DiskStore::new(&config.storage.uploads_dir, BASE_URL).unwrap();
    let pipeline = UploadPipeline::new(
        disk,
        Some(RemoteBackend {
            host: Arc::new(DownHost),
            folder: "fileuploader".to_string(),
        }),
    );
    let state = Arc::new(AppState {
        config,
        pipeline,
        started_at: Instant::now(),
    });
    api::create_router(state)
}

fn file_part(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn text_part_only(name: &str, value: &str) -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
    )
    .into_bytes()
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_upload_and_fetch_roundtrip() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let body = file_part("cat.png", "image/png", b"png pixels");
    let (status, json) = send(&app, upload_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "File uploaded successfully!");
    assert_eq!(json["file"]["displayName"], "cat.png");

    let filename = json["file"]["filename"].as_str().unwrap();
    assert!(filename.ends_with(".png"));
    assert_eq!(
        json["file"]["url"],
        format!("{BASE_URL}/uploads/{filename}")
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/uploads/{filename}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
    let served = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&served[..], b"png pixels");
}

#[tokio::test]
async fn test_long_filename_upload_fetch_delete() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    // A stem near the sanitizer's length cap; the stored key gains a
    // suffix on top and every returned url must still resolve.
    let long_name = format!("{}.png", "a".repeat(110));
    let body = file_part(&long_name, "image/png", b"png pixels");
    let (status, json) = send(&app, upload_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["file"]["displayName"], long_name.as_str());
    let filename = json["file"]["filename"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Request::builder()
            .uri(format!("/uploads/{filename}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/upload/{filename}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "File deleted successfully");
}

#[tokio::test]
async fn test_upload_response_shape() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let body = file_part("dog.jpg", "image/jpeg", b"jpeg pixels");
    let (_, json) = send(&app, upload_request(body)).await;

    let mut top: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    top.sort();
    assert_eq!(top, ["file", "message"]);

    let mut file: Vec<&str> = json["file"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    file.sort();
    assert_eq!(file, ["displayName", "filename", "url"]);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let body = text_part_only("note", "no file here");
    let (status, json) = send(&app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_with_text_valued_image_field() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    // The right field name, but a plain form value with no filename.
    let body = text_part_only("image", "not a file");
    let (status, json) = send(&app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let body = file_part("doc.pdf", "application/pdf", b"%PDF-1.4");
    let (status, json) = send(&app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Unsupported file type");

    // Nothing may be persisted for a rejected upload.
    assert_eq!(
        std::fs::read_dir(dir.path().join("uploads")).unwrap().count(),
        0
    );
}

#[tokio::test]
async fn test_upload_rejects_mismatched_extension() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let body = file_part("script.exe", "image/png", b"MZ");
    let (status, json) = send(&app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Unsupported file type");
}

#[tokio::test]
async fn test_upload_rejects_oversize_file() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let big = vec![0u8; 6 * 1024 * 1024];
    let body = file_part("big.jpg", "image/jpeg", &big);
    let (status, json) = send(&app, upload_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "File too large (max 5MB)");
    assert_eq!(
        std::fs::read_dir(dir.path().join("uploads")).unwrap().count(),
        0
    );
}

#[tokio::test]
async fn test_upload_succeeds_when_remote_is_down() {
    let dir = TempDir::new().unwrap();
    let app = test_app_with_down_remote(&dir);

    let body = file_part("photo.jpeg", "image/jpeg", b"jpeg pixels");
    let (status, json) = send(&app, upload_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "File uploaded successfully!");
    assert!(json["file"]["filename"]
        .as_str()
        .unwrap()
        .ends_with(".jpeg"));
    assert_eq!(
        std::fs::read_dir(dir.path().join("uploads")).unwrap().count(),
        1
    );
}

#[tokio::test]
async fn test_list_empty() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/api/upload")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "files": [] }));
}

#[tokio::test]
async fn test_list_after_uploads() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    for name in ["a.png", "b.jpg"] {
        let content_type = if name.ends_with(".png") {
            "image/png"
        } else {
            "image/jpeg"
        };
        let (status, _) = send(&app, upload_request(file_part(name, content_type, b"x"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/api/upload")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let files = json["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    for file in files {
        let filename = file["filename"].as_str().unwrap();
        assert_eq!(file["url"], format!("{BASE_URL}/uploads/{filename}"));
        assert_eq!(file["displayName"], filename);
    }
    assert_ne!(files[0]["filename"], files[1]["filename"]);
}

#[tokio::test]
async fn test_delete_flow() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (_, json) = send(&app, upload_request(file_part("gone.png", "image/png", b"x"))).await;
    let filename = json["file"]["filename"].as_str().unwrap().to_string();

    let delete_request = |filename: &str| {
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/upload/{filename}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, json) = send(&app, delete_request(&filename)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "File deleted successfully");

    let (status, json) = send(&app, delete_request(&filename)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "File not found");
}

#[tokio::test]
async fn test_delete_rejects_traversal() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, json) = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri("/api/upload/..%2F..%2Fpasswd")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid filename");
}

#[tokio::test]
async fn test_static_unknown_file_is_404() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/uploads/nope.png")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "File not found");
}

#[tokio::test]
async fn test_static_rejects_unsafe_names() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/uploads/..%2Fssecret.png")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid filename");
}

#[tokio::test]
async fn test_dot_names_rejected_before_filesystem() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    // Dot sequences address directories; they must be turned away at the
    // door instead of reaching the filesystem as read or delete targets.
    for name in [".", ".."] {
        let (status, json) = send(
            &app,
            Request::builder()
                .uri(format!("/uploads/{name}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "GET {name:?}");
        assert_eq!(json["error"], "Invalid filename");

        let (status, json) = send(
            &app,
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/upload/{name}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "DELETE {name:?}");
        assert_eq!(json["error"], "Invalid filename");
    }
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["uptime"].is_u64());
    assert!(json["timestamp"].is_i64());
}

#[tokio::test]
async fn test_cors_headers_for_allowed_origin() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, ORIGIN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        ORIGIN
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_cors_preflight_for_delete() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/upload/some.png")
                .header(header::ORIGIN, ORIGIN)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("DELETE"));
}
