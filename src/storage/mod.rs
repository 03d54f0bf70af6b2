mod local;
mod remote;

pub use local::DiskStore;
pub use remote::Cloudinary;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),
}

/// A file after successful persistence in either backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Unique identifier: the filename on disk, or the remote public id.
    pub key: String,
    /// Human-readable name for display purposes.
    pub display_name: String,
    /// Fully qualified URL the file can be fetched from.
    pub url: String,
}

/// Remote media host backend.
///
/// Implementations own their transport and credentials; callers hand over
/// the full file buffer and get back a [`StoredFile`] describing where the
/// bytes ended up.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload a byte buffer. The original (unsanitized) filename is used to
    /// derive the public id and is safe here since it never touches a
    /// filesystem path.
    async fn store(&self, data: Bytes, original_name: &str) -> Result<StoredFile, RemoteError>;

    /// List stored resources whose public id starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<StoredFile>, RemoteError>;

    /// Delete a resource by public id. Returns `false` when no such
    /// resource exists.
    async fn delete(&self, public_id: &str) -> Result<bool, RemoteError>;
}
