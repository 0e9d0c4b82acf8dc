//! Collection endpoint routes.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use folio_engine::{Counts, FieldSchema, ResourceState};

use super::collection;
use crate::error::Result;
use crate::handlers::{
    handle_counts, handle_overview, handle_summaries, CollectionSummary, OverviewResponse,
    RecordsQuery,
};
use crate::AppState;

/// Create collection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/collections", get(list_handler))
        .route("/api/collections/{name}/schema", get(schema_handler))
        .route("/api/collections/{name}/counts", get(counts_handler))
        .route("/api/collections/{name}/state", get(state_handler))
        .route("/api/collections/{name}/overview", get(overview_handler))
}

/// GET /api/collections - Catalog summary.
async fn list_handler(State(state): State<AppState>) -> Json<Vec<CollectionSummary>> {
    Json(handle_summaries(&state.registry))
}

/// GET /api/collections/{name}/schema - Field schema.
async fn schema_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FieldSchema>> {
    let collection = collection(&state, &name)?;
    Ok(Json(collection.schema.as_ref().clone()))
}

/// GET /api/collections/{name}/counts - Total and per-type counts.
async fn counts_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Counts>> {
    let collection = collection(&state, &name)?;
    Ok(Json(handle_counts(&collection).await?))
}

/// GET /api/collections/{name}/state - Resource manager state.
async fn state_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ResourceState>> {
    let collection = collection(&state, &name)?;
    Ok(Json(collection.manager.state()))
}

/// GET /api/collections/{name}/overview - Counts plus one page.
async fn overview_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<OverviewResponse>> {
    let collection = collection(&state, &name)?;
    Ok(Json(handle_overview(&collection, query).await?))
}
