//! Multipart image intake shared by canteen and menu routes

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::storage::UploadedImage;

/// Multipart field carrying the file
const IMAGE_FIELD: &str = "image";

#[derive(Debug)]
pub(super) struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Pull the `image` field out of a multipart body.
pub(super) async fn read_image(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<ImageUpload, ApiError> {
    let to_api = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge { limit: max_bytes }
        } else {
            ApiError::bad_request(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(to_api)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_owned();
        if !content_type.starts_with("image/") {
            return Err(ApiError::bad_request("image must have an image/* content type"));
        }
        let filename = field.file_name().unwrap_or("upload").to_owned();

        let bytes = field.bytes().await.map_err(to_api)?;
        if bytes.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge { limit: max_bytes });
        }
        if bytes.is_empty() {
            return Err(ApiError::bad_request("image is empty"));
        }

        return Ok(ImageUpload {
            bytes: bytes.to_vec(),
            filename,
            content_type,
        });
    }

    Err(ApiError::bad_request("multipart field 'image' is required"))
}

/// Upload into `<configured folder>/<subfolder>`.
pub(super) async fn store(
    state: &AppState,
    upload: ImageUpload,
    subfolder: &str,
) -> Result<UploadedImage, ApiError> {
    let folder = format!("{}/{}", state.settings.image_folder, subfolder);
    let image = state
        .images
        .upload(upload.bytes, &upload.filename, &upload.content_type, &folder)
        .await?;
    Ok(image)
}
