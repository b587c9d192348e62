//! Image hosting for canteen and menu pictures

pub mod cloudinary;

use async_trait::async_trait;
use serde::Deserialize;

pub use cloudinary::CloudinaryStore;

/// Where an uploaded image ended up
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedImage {
    #[serde(rename = "secure_url")]
    pub url: String,
    pub public_id: String,
}

/// Image store failures
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image store returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Upload seam used by the image routes
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
        folder: &str,
    ) -> Result<UploadedImage, ImageError>;
}
