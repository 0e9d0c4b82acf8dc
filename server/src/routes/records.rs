//! Record endpoint routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use folio_engine::{Fields, Page, Record};

use super::collection;
use crate::error::Result;
use crate::handlers::{
    handle_bulk, handle_comment, handle_create, handle_delete, handle_like, handle_list,
    handle_update,
    BulkResponse, CommentRequest, CommentResponse, LikeRequest, LikeResponse, RecordsQuery,
};
use crate::AppState;

/// Create record routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/collections/{name}/records",
            get(list_handler).post(create_handler).delete(delete_all_handler),
        )
        .route("/api/collections/{name}/records/bulk", post(bulk_handler))
        .route(
            "/api/collections/{name}/records/{id}",
            put(update_handler).delete(delete_handler),
        )
        .route("/api/collections/{name}/records/{id}/like", post(like_handler))
        .route(
            "/api/collections/{name}/records/{id}/comments",
            post(comment_handler),
        )
}

/// GET /api/collections/{name}/records - One page of records.
async fn list_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<Page>> {
    let collection = collection(&state, &name)?;
    Ok(Json(handle_list(&collection, query).await?))
}

/// POST /api/collections/{name}/records - Validate and create a record.
async fn create_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<Fields>,
) -> Result<(StatusCode, Json<Record>)> {
    let collection = collection(&state, &name)?;
    let record = handle_create(&collection, state.registry.kinds(), payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /api/collections/{name}/records/bulk - Validate and create many records.
async fn bulk_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<Vec<Fields>>,
) -> Result<(StatusCode, Json<BulkResponse>)> {
    let collection = collection(&state, &name)?;
    let response = handle_bulk(&collection, state.registry.kinds(), payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /api/collections/{name}/records/{id} - Replace a record's fields.
async fn update_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(payload): Json<Fields>,
) -> Result<StatusCode> {
    let collection = collection(&state, &name)?;
    handle_update(&collection, state.registry.kinds(), &id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/collections/{name}/records/{id} - Delete one record.
async fn delete_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let collection = collection(&state, &name)?;
    handle_delete(&collection, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/collections/{name}/records - Delete every record.
async fn delete_all_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    let collection = collection(&state, &name)?;
    collection.manager.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/collections/{name}/records/{id}/like - Toggle an actor's like.
async fn like_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(request): Json<LikeRequest>,
) -> Result<Json<LikeResponse>> {
    let collection = collection(&state, &name)?;
    Ok(Json(handle_like(&collection, &id, request).await?))
}

/// POST /api/collections/{name}/records/{id}/comments - Add a comment.
async fn comment_handler(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let collection = collection(&state, &name)?;
    let response = handle_comment(&collection, &id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
