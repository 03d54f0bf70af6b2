use std::path::{Path, PathBuf};

use bytes::Bytes;
use rand::Rng;

use super::{StorageError, StoredFile};
use crate::upload::{self, ALLOWED_EXTENSIONS};

/// Local filesystem storage backend.
///
/// Uploads land as flat files inside a single directory; the filename is
/// the only persisted identifier, so all metadata (display name, URL) is
/// derived from it.
pub struct DiskStore {
    uploads_dir: PathBuf,
    public_base_url: String,
}

impl DiskStore {
    /// Create the store, ensuring the uploads directory exists.
    pub fn new<P: AsRef<Path>>(uploads_dir: P, public_base_url: &str) -> Result<Self, StorageError> {
        let uploads_dir = uploads_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&uploads_dir)?;

        Ok(Self {
            uploads_dir,
            public_base_url: public_base_url.to_string(),
        })
    }

    fn file_path(&self, filename: &str) -> PathBuf {
        self.uploads_dir.join(filename)
    }

    fn file_url(&self, filename: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, filename)
    }

    /// Persist a byte buffer under a fresh unique name.
    ///
    /// The filename is `<stem>-<epoch millis>-<random><ext>` where `<stem>`
    /// is the sanitized name without its extension. The timestamp/random
    /// pair keeps concurrent writers from colliding without any cross-task
    /// coordination.
    pub async fn store(
        &self,
        data: Bytes,
        sanitized_name: &str,
        extension: &str,
    ) -> Result<StoredFile, StorageError> {
        let stem = sanitized_name
            .strip_suffix(extension)
            .unwrap_or(sanitized_name);
        // Cap the stem so the key, suffix and extension included, stays
        // within the 120-char bound sanitized names satisfy.
        let stem: String = stem.chars().take(90).collect();
        let filename = format!(
            "{stem}-{}-{}{extension}",
            chrono::Utc::now().timestamp_millis(),
            rand::thread_rng().gen_range(0..1_000_000_000u32),
        );

        // The directory can disappear at runtime; recreate it before writing.
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        tokio::fs::write(self.file_path(&filename), &data).await?;

        Ok(StoredFile {
            url: self.file_url(&filename),
            display_name: sanitized_name.to_string(),
            key: filename,
        })
    }

    /// Enumerate stored files, keeping only names with a whitelisted image
    /// extension. Order follows directory enumeration and is unspecified.
    pub async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.uploads_dir).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            let extension = upload::file_extension(name);
            if ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(extension))
            {
                files.push(StoredFile {
                    key: name.to_string(),
                    display_name: name.to_string(),
                    url: self.file_url(name),
                });
            }
        }

        Ok(files)
    }

    /// Remove a stored file. Returns `false` when nothing was there to
    /// delete.
    pub async fn delete(&self, filename: &str) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(self.file_path(filename)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
