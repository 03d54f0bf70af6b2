//! Upload orchestration: validation, backend selection, and fallback.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::storage::{DiskStore, MediaHost, RemoteError, StorageError, StoredFile};
use crate::upload::{self, RejectReason};

/// One file extracted from an inbound request, consumed exactly once.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Full file contents, buffered in memory.
    pub bytes: Bytes,
    /// Filename as the client declared it. Untrusted.
    pub original_name: String,
    /// MIME type as the client declared it. Untrusted.
    pub content_type: String,
    /// Declared size in bytes.
    pub size: u64,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("{0}")]
    Rejected(RejectReason),

    #[error("Failed to save file")]
    StorageFailed(#[source] StorageError),
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("Failed to list uploaded files")]
    Remote(#[source] RemoteError),

    #[error("Failed to read uploads")]
    Local(#[source] StorageError),
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("File not found")]
    NotFound,

    #[error("Invalid filename")]
    InvalidName,

    #[error("Failed to delete file")]
    Remote(#[source] RemoteError),

    #[error("Failed to delete file")]
    Local(#[source] StorageError),
}

/// The configured media host plus the folder its resources live under.
pub struct RemoteBackend {
    pub host: Arc<dyn MediaHost>,
    pub folder: String,
}

/// Routes uploads, listings, and deletions to the right backend.
///
/// The preference is fixed at startup: remote when configured, local disk
/// otherwise. A failed remote upload falls back to disk so the client
/// still gets a working URL; reads never fall back, since mixing backend
/// states would misrepresent what the active backend holds.
pub struct UploadPipeline {
    local: DiskStore,
    remote: Option<RemoteBackend>,
}

impl UploadPipeline {
    pub fn new(local: DiskStore, remote: Option<RemoteBackend>) -> Self {
        Self { local, remote }
    }

    /// Run one upload through validation and storage.
    ///
    /// `None` means the request carried no usable file part. Validation
    /// rejects before any backend is touched, so a rejected upload leaves
    /// no partial state anywhere.
    pub async fn handle_upload(
        &self,
        file: Option<IncomingFile>,
    ) -> Result<StoredFile, UploadError> {
        let IncomingFile {
            bytes,
            original_name,
            content_type,
            size,
        } = file.ok_or(UploadError::MissingFile)?;

        let extension = upload::file_extension(&original_name);
        upload::validate(&content_type, extension, size).map_err(UploadError::Rejected)?;

        let safe_name = upload::sanitize_filename(&original_name);

        if let Some(remote) = &self.remote {
            match remote.host.store(bytes.clone(), &original_name).await {
                Ok(stored) => {
                    tracing::debug!(key = %stored.key, "Uploaded to remote media host");
                    return Ok(stored);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Remote upload failed, falling back to local disk");
                }
            }
        }

        match self.local.store(bytes, &safe_name, extension).await {
            Ok(stored) => {
                tracing::debug!(key = %stored.key, "Stored upload on local disk");
                Ok(stored)
            }
            Err(e) => {
                tracing::error!(error = %e, "Local store failed");
                Err(UploadError::StorageFailed(e))
            }
        }
    }

    /// List stored files from the active backend only.
    pub async fn handle_list(&self) -> Result<Vec<StoredFile>, ListError> {
        match &self.remote {
            Some(remote) => remote.host.list(&remote.folder).await.map_err(|e| {
                tracing::error!(error = %e, "Remote listing failed");
                ListError::Remote(e)
            }),
            None => self.local.list().await.map_err(|e| {
                tracing::error!(error = %e, "Local listing failed");
                ListError::Local(e)
            }),
        }
    }

    /// Delete a stored file by the name clients know it under: the local
    /// filename, or the final segment of the remote public id.
    pub async fn handle_delete(&self, name: &str) -> Result<(), DeleteError> {
        // Stored names use the sanitizer's character set only, so anything
        // outside it (or a bare dot sequence) cannot refer to a stored file.
        if !upload::is_safe_filename(name) {
            return Err(DeleteError::InvalidName);
        }

        match &self.remote {
            Some(remote) => {
                let public_id = format!("{}/{}", remote.folder, name);
                match remote.host.delete(&public_id).await {
                    Ok(true) => {
                        tracing::debug!(%public_id, "Deleted remote resource");
                        Ok(())
                    }
                    Ok(false) => Err(DeleteError::NotFound),
                    Err(e) => {
                        tracing::error!(error = %e, "Remote delete failed");
                        Err(DeleteError::Remote(e))
                    }
                }
            }
            None => match self.local.delete(name).await {
                Ok(true) => {
                    tracing::debug!(filename = %name, "Deleted local file");
                    Ok(())
                }
                Ok(false) => Err(DeleteError::NotFound),
                Err(e) => {
                    tracing::error!(error = %e, "Local delete failed");
                    Err(DeleteError::Local(e))
                }
            },
        }
    }
}
