//! Upload endpoint routes.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    routing::post,
    Json, Router,
};

use super::collection;
use crate::error::Result;
use crate::handlers::{handle_upload, UploadResponse};
use crate::AppState;

/// Create upload routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/uploads/{*path}", post(upload_handler))
        .route(
            "/api/collections/{name}/uploads/{file}",
            post(collection_upload_handler),
        )
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// POST /api/uploads/{*path} - Store the raw body and return its URL.
async fn upload_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    let response =
        handle_upload(state.blobs.as_ref(), &path, content_type(&headers), body.to_vec()).await?;
    Ok(Json(response))
}

/// POST /api/collections/{name}/uploads/{file} - Store the raw body under the
/// collection's upload prefix.
async fn collection_upload_handler(
    State(state): State<AppState>,
    Path((name, file)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>> {
    let collection = collection(&state, &name)?;
    let path = format!("{}/{}", collection.entry.upload_prefix(), file);
    let response =
        handle_upload(state.blobs.as_ref(), &path, content_type(&headers), body.to_vec()).await?;
    Ok(Json(response))
}
