//! Collection handlers - catalog summary, counts and state.

use super::records::{handle_list, RecordsQuery};
use crate::error::Result;
use crate::registry::{Collection, CollectionRegistry};
use folio_engine::{Counts, FieldName, Page};
use serde::Serialize;

/// Catalog summary of one collection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub name: String,
    pub label: String,
    pub type_field: Option<FieldName>,
    pub search_fields: Vec<FieldName>,
    pub page_size: usize,
    pub field_count: usize,
}

/// Counts and one page, fetched together.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub counts: Counts,
    pub page: Page,
}

pub fn handle_summaries(registry: &CollectionRegistry) -> Vec<CollectionSummary> {
    registry
        .all()
        .iter()
        .map(|collection| {
            let config = &collection.entry.config;
            CollectionSummary {
                name: config.name.clone(),
                label: config.label.clone(),
                type_field: config.type_field.clone(),
                search_fields: config.search_fields.clone(),
                page_size: config.page_size,
                field_count: collection.schema.len(),
            }
        })
        .collect()
}

pub async fn handle_counts(collection: &Collection) -> Result<Counts> {
    Ok(collection.manager.fetch_counts().await?)
}

/// Refresh counts and the requested page concurrently.
pub async fn handle_overview(
    collection: &Collection,
    query: RecordsQuery,
) -> Result<OverviewResponse> {
    let (counts, page) =
        futures::try_join!(handle_counts(collection), handle_list(collection, query))?;
    Ok(OverviewResponse { counts, page })
}
