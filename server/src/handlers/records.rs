//! Record handlers - paging, validated writes and subresources.

use crate::error::{AppError, Result};
use crate::registry::Collection;
use folio_engine::{
    is_path_segment, Comment, FieldErrors, Fields, FormEngine, KindRegistry, Page, Record,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query parameters for listing records.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsQuery {
    /// 1-based page number (default 1)
    pub page: Option<usize>,
    /// Page size (default: the collection's page size)
    pub page_size: Option<usize>,
    /// Value of the collection's type field to filter on
    #[serde(rename = "type")]
    pub type_value: Option<String>,
    /// Free-text search
    pub search: Option<String>,
}

/// Response for bulk create.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    pub created: Vec<Record>,
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub actor: String,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub actor_name: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub comment: Comment,
}

/// Run a raw payload through the collection's form and return the
/// normalised values.
///
/// Unknown fields are a bad request; failed field checks are a validation
/// error. Fields missing from the payload take their kind's default.
pub fn validate_payload(
    collection: &Collection,
    kinds: Arc<KindRegistry>,
    payload: Fields,
) -> Result<Fields> {
    let mut form = FormEngine::with_registry(collection.schema.clone(), kinds);
    for (name, value) in payload {
        form.set_value(&name, value)?;
    }
    let submission = form.prepare()?;
    Ok(submission.values)
}

/// Reject a record id or actor that cannot stand as one store key.
fn store_key<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    if is_path_segment(value) {
        Ok(value)
    } else {
        Err(AppError::BadRequest(format!("invalid {} '{}'", what, value)))
    }
}

/// Fetch one page of records.
pub async fn handle_list(collection: &Collection, query: RecordsQuery) -> Result<Page> {
    let config = &collection.entry.config;
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(config.page_size);
    let type_value = query.type_value.as_deref().filter(|v| !v.is_empty());

    if type_value.is_some() && config.type_field.is_none() {
        return Err(AppError::BadRequest(format!(
            "collection '{}' has no type field",
            config.name
        )));
    }

    let page = collection
        .manager
        .fetch(page, page_size, type_value, query.search.as_deref())
        .await?;
    Ok(page)
}

/// Validate and create one record.
pub async fn handle_create(
    collection: &Collection,
    kinds: Arc<KindRegistry>,
    payload: Fields,
) -> Result<Record> {
    let values = validate_payload(collection, kinds, payload)?;
    Ok(collection.manager.create(values).await?)
}

/// Validate every item, then create them in order.
///
/// Nothing is written unless every item validates. Field errors are keyed
/// `[index].field`. A store failure part-way leaves earlier items created.
pub async fn handle_bulk(
    collection: &Collection,
    kinds: Arc<KindRegistry>,
    payload: Vec<Fields>,
) -> Result<BulkResponse> {
    if payload.is_empty() {
        return Ok(BulkResponse {
            created: Vec::new(),
        });
    }

    let mut batch = Vec::with_capacity(payload.len());
    let mut errors = FieldErrors::new();
    for (index, item) in payload.into_iter().enumerate() {
        match validate_payload(collection, kinds.clone(), item) {
            Ok(values) => batch.push(values),
            Err(AppError::Validation(item_errors)) => {
                errors.extend(
                    item_errors
                        .into_iter()
                        .map(|(field, err)| (format!("[{}].{}", index, field), err)),
                );
            }
            Err(e) => return Err(e),
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let created = collection.manager.create_many(batch).await?;
    Ok(BulkResponse { created })
}

/// Validate and replace a record's fields.
pub async fn handle_update(
    collection: &Collection,
    kinds: Arc<KindRegistry>,
    id: &str,
    payload: Fields,
) -> Result<()> {
    let id = store_key("record id", id)?;
    let values = validate_payload(collection, kinds, payload)?;
    if collection.manager.update(id, values).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("record '{}'", id)))
    }
}

pub async fn handle_delete(collection: &Collection, id: &str) -> Result<()> {
    let id = store_key("record id", id)?;
    Ok(collection.manager.delete_one(id).await?)
}

pub async fn handle_like(collection: &Collection, id: &str, request: LikeRequest) -> Result<LikeResponse> {
    let actor = request.actor.trim();
    if actor.is_empty() {
        return Err(AppError::BadRequest("actor is required".to_string()));
    }
    let id = store_key("record id", id)?;
    let actor = store_key("actor", actor)?;
    let liked = collection.manager.toggle_like(id, actor).await?;
    Ok(LikeResponse { liked })
}

pub async fn handle_comment(
    collection: &Collection,
    id: &str,
    request: CommentRequest,
) -> Result<CommentResponse> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("comment text is required".to_string()));
    }
    let id = store_key("record id", id)?;
    let (id, comment) = collection
        .manager
        .add_comment(id, request.actor_name.trim(), text)
        .await?;
    Ok(CommentResponse { id, comment })
}
