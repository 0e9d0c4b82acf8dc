//! Folio Server - admin API for schema-driven content collections.
//!
//! Hosts one resource manager per catalog entry and exposes paging, counts,
//! validated writes, likes, comments and uploads over HTTP.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod rest;
pub mod routes;

use crate::registry::CollectionRegistry;
use axum::Router;
use folio_engine::BlobStore;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CollectionRegistry>,
    pub blobs: Arc<dyn BlobStore>,
}

/// Build the router with tracing and CORS layers applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
