//! `/upload` endpoints and image URL resolution.

use crate::error::{ApiError, ApiResult};
use crate::pipeline::RequestPipeline;
use crate::types::UploadImageResponse;
use crate::validation::ValidationErrors;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;
use tracing::info;

/// Largest image accepted for upload (2 MiB).
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Multipart field carrying the file.
const IMAGE_FIELD: &str = "image";

/// Resolve a stored image reference to a fetchable URL.
///
/// Absolute `http(s)` URLs pass through. Anything else is reduced to its
/// last path segment and served from `{base}/upload/image/`.
pub fn image_url(base_url: &str, file_name_or_path: &str) -> String {
    if file_name_or_path.is_empty() {
        return String::new();
    }
    if file_name_or_path.starts_with("http") {
        return file_name_or_path.to_string();
    }

    let file_name = file_name_or_path
        .rsplit('/')
        .next()
        .unwrap_or(file_name_or_path);
    format!("{}/upload/image/{}", base_url.trim_end_matches('/'), file_name)
}

#[derive(Clone)]
pub struct UploadsApi {
    pipeline: RequestPipeline,
}

impl UploadsApi {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self { pipeline }
    }

    /// `POST /upload/image` as multipart form data.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> ApiResult<UploadImageResponse> {
        validate_image(&bytes, mime_type)?;

        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|_| invalid_image(format!("unsupported content type: {mime_type}")))?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let builder = self
            .pipeline
            .request(Method::POST, "/upload/image")?
            .multipart(form);
        let uploaded: UploadImageResponse = self.pipeline.execute(builder).await?.into_data()?;

        info!(
            file_name = %file_name,
            size,
            image_id = uploaded.image_id,
            "Image uploaded"
        );
        Ok(uploaded)
    }

    /// `DELETE /upload/image/{id}`.
    pub async fn delete_image(&self, image_id: i64) -> ApiResult<()> {
        self.pipeline
            .delete::<Value>(&format!("/upload/image/{image_id}"))
            .await?
            .into_result()?;
        info!(image_id, "Image deleted");
        Ok(())
    }

    /// Resolve an image reference against this pipeline's base URL.
    pub fn image_url(&self, file_name_or_path: &str) -> String {
        image_url(self.pipeline.base_url(), file_name_or_path)
    }
}

fn validate_image(bytes: &[u8], mime_type: &str) -> ApiResult<()> {
    if !mime_type.starts_with("image/") {
        return Err(invalid_image(format!("not an image: {mime_type}")));
    }
    if bytes.is_empty() {
        return Err(invalid_image("file is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(invalid_image(format!(
            "file is {} bytes, the limit is {MAX_IMAGE_BYTES}",
            bytes.len()
        )));
    }
    Ok(())
}

fn invalid_image(message: String) -> ApiError {
    let mut errors = ValidationErrors::new();
    errors.add(IMAGE_FIELD, message);
    ApiError::Validation(errors)
}

/// Guess an image content type from a file extension.
pub fn mime_from_extension(path: &str) -> Option<&'static str> {
    let extension = path.rsplit('.').next()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
