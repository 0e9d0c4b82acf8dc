//! HTTP route definitions.

mod collections;
mod health;
mod records;
mod uploads;

use crate::error::{AppError, Result};
use crate::registry::Collection;
use crate::AppState;
use axum::Router;
use std::sync::Arc;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(collections::routes())
        .merge(records::routes())
        .merge(uploads::routes())
}

/// Look up a collection named in the path.
fn collection(state: &AppState, name: &str) -> Result<Arc<Collection>> {
    state
        .registry
        .get(name)
        .ok_or_else(|| AppError::NotFound(format!("collection '{}'", name)))
}
