//! Cloudinary signed uploads
//!
//! Signature: SHA-256 hex of the signed params sorted by name, joined as
//! `k=v&k=v`, with the API secret appended.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use sha2::{Digest, Sha256};

use super::{ImageError, ImageStore, UploadedImage};

pub struct CloudinaryStore {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl CloudinaryStore {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", self.base_url, self.cloud_name)
    }
}

/// Sign `params` for an upload request.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
        folder: &str,
    ) -> Result<UploadedImage, ImageError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let file = Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(content_type)?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_owned())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body: String = response.text().await.unwrap_or_default().chars().take(500).collect();
            return Err(ImageError::Api { status, body });
        }

        let image: UploadedImage = response.json().await?;
        tracing::info!(public_id = %image.public_id, folder, "image uploaded");
        Ok(image)
    }
}

impl std::fmt::Debug for CloudinaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryStore")
            .field("cloud_name", &self.cloud_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_order_independent() {
        let a = sign_params(&[("timestamp", "1700000000"), ("folder", "canteen")], "s3cr3t");
        let b = sign_params(&[("folder", "canteen"), ("timestamp", "1700000000")], "s3cr3t");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn signature_matches_manual_digest() {
        let expected = hex::encode(Sha256::digest(b"folder=canteen&timestamp=1700000000s3cr3t"));
        assert_eq!(
            sign_params(&[("timestamp", "1700000000"), ("folder", "canteen")], "s3cr3t"),
            expected
        );
    }

    #[test]
    fn upload_url_includes_cloud() {
        let store = CloudinaryStore::new("demo", "key", "secret", "https://api.cloudinary.com/v1_1/");
        assert_eq!(store.upload_url(), "https://api.cloudinary.com/v1_1/demo/image/upload");
    }

    #[test]
    fn upload_response_parses() {
        let json = r#"{"public_id":"canteen/abc","secure_url":"https://res.cloudinary.com/demo/image/upload/canteen/abc.jpg","bytes":1024}"#;
        let image: UploadedImage = serde_json::from_str(json).unwrap();
        assert_eq!(image.public_id, "canteen/abc");
        assert!(image.url.starts_with("https://"));
    }
}
