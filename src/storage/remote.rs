use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;

use super::{MediaHost, RemoteError, StoredFile};
use crate::config::RemoteConfig;
use crate::upload;

/// Cloudinary media host backend.
///
/// Mutating calls (upload, destroy) are signed with the account's API
/// secret: SHA-1 over the alphabetically sorted request parameters. The
/// Admin API listing uses HTTP basic auth instead.
pub struct Cloudinary {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadedResource {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    resources: Vec<UploadedResource>,
}

#[derive(Debug, Deserialize)]
struct DestroyOutcome {
    result: String,
}

impl Cloudinary {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        })
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.cloud_name
        )
    }

    fn resources_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/resources/image/upload",
            self.cloud_name
        )
    }

    fn destroy_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/destroy",
            self.cloud_name
        )
    }

    /// Sign request parameters as the API expects: SHA-1 hex digest over
    /// the sorted `key=value` pairs joined with `&`, with the API secret
    /// appended.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by_key(|(key, _)| *key);

        let joined = sorted
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let digest = ring::digest::digest(
            &ring::digest::SHA1_FOR_LEGACY_USE_ONLY,
            format!("{joined}{}", self.api_secret).as_bytes(),
        );
        hex_encode(digest.as_ref())
    }
}

#[async_trait]
impl MediaHost for Cloudinary {
    async fn store(&self, data: Bytes, original_name: &str) -> Result<StoredFile, RemoteError> {
        // The host appends the delivery format itself, so the requested
        // public id carries the stem only, suffixed for uniqueness.
        let public_id = format!(
            "{}-{}",
            upload::file_stem(original_name),
            chrono::Utc::now().timestamp_millis(),
        );
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("folder", &self.folder),
            ("public_id", &public_id),
            ("timestamp", &timestamp),
        ]);

        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(original_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.folder.clone())
            .text("public_id", public_id)
            .text("signature", signature);

        let resp = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Api(format!(
                "Cloudinary upload failed ({status}): {body}"
            )));
        }

        let uploaded: UploadedResource = resp.json().await?;

        Ok(StoredFile {
            key: uploaded.public_id,
            display_name: original_name.to_string(),
            url: uploaded.secure_url,
        })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredFile>, RemoteError> {
        let resp = self
            .client
            .get(self.resources_url())
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .query(&[("prefix", prefix), ("max_results", "100")])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Api(format!(
                "Cloudinary listing failed ({status}): {body}"
            )));
        }

        let listing: ResourceList = resp.json().await?;

        Ok(listing
            .resources
            .into_iter()
            .map(|resource| {
                let display_name = resource
                    .public_id
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                StoredFile {
                    key: resource.public_id,
                    display_name,
                    url: resource.secure_url,
                }
            })
            .collect())
    }

    async fn delete(&self, public_id: &str) -> Result<bool, RemoteError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", public_id), ("timestamp", &timestamp)]);

        let resp = self
            .client
            .post(self.destroy_url())
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Api(format!(
                "Cloudinary destroy failed ({status}): {body}"
            )));
        }

        let outcome: DestroyOutcome = resp.json().await?;
        Ok(outcome.result == "ok")
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
