//! image-uploader - Image upload API with dual storage backends
//!
//! This crate provides image upload, listing, and serving with:
//! - Strict MIME/extension whitelisting and filename sanitization
//! - Swappable storage backends (Cloudinary media host, local filesystem)
//! - Automatic fallback to local disk when a remote upload fails
//! - REST API with multipart upload support

pub mod api;
pub mod config;
pub mod pipeline;
pub mod storage;
pub mod upload;

use std::time::Instant;

use config::Config;
use pipeline::UploadPipeline;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub pipeline: UploadPipeline,
    pub started_at: Instant,
}
