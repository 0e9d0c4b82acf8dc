//! Upload handler - stores bytes in the blob service.

use crate::error::{AppError, Result};
use folio_engine::BlobStore;
use serde::Serialize;

/// Fallback when the request carries no content type.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

pub async fn handle_upload(
    blobs: &dyn BlobStore,
    path: &str,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> Result<UploadResponse> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("upload body is empty".to_string()));
    }
    let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE);
    let url = blobs.upload(path, bytes, content_type).await?;
    tracing::info!(path = %path, content_type = %content_type, "Stored upload");
    Ok(UploadResponse { url })
}
