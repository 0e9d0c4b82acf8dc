//! Remote collection adapter.
//!
//! Translates collection-level intents (fetch a page, tally types, create,
//! like, ...) into calls against a [`DocumentStore`]. Every failure leaves
//! here as a single [`AdapterError`] carrying a human message.

use crate::error::{AdapterError, Result, StoreError};
use crate::paging::{self, FieldFilter, Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::record::{strip_reserved, Comment, Fields};
use crate::schema::is_path_segment;
use crate::store::{child_path, segments, DocumentStore};
use crate::{CollectionName, CommentId, FieldName, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Configuration of one collection instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConfig {
    /// Store path of the collection root
    pub name: CollectionName,
    /// Human noun used in status messages ("poems")
    pub label: String,
    /// Field tallied by `fetch_counts` and used by type filters
    #[serde(default)]
    pub type_field: Option<FieldName>,
    /// Fields matched by free-text search; empty means every field
    #[serde(default)]
    pub search_fields: Vec<FieldName>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl CollectionConfig {
    pub fn new(name: impl Into<CollectionName>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            type_field: None,
            search_fields: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_type_field(mut self, field: impl Into<FieldName>) -> Self {
        self.type_field = Some(field.into());
        self
    }

    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Whether `name` addresses a subtree below the store root, with every
    /// segment usable as a store key.
    pub fn has_valid_name(&self) -> bool {
        !self.name.starts_with('/')
            && !self.name.ends_with('/')
            && self.name.split('/').all(is_path_segment)
    }
}

/// Check a caller-supplied key (record id, actor) before it becomes one
/// store path segment.
fn key<'a>(what: &str, value: &'a str) -> Result<&'a str> {
    if is_path_segment(value) {
        Ok(value)
    } else {
        Err(AdapterError::invalid_key(what, value))
    }
}

/// Collection size and per-type tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub total_count: usize,
    pub counts_by_type: BTreeMap<String, usize>,
}

/// Adapter bound to one collection of one store.
#[derive(Clone)]
pub struct CollectionAdapter {
    store: Arc<dyn DocumentStore>,
    config: CollectionConfig,
}

impl std::fmt::Debug for CollectionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CollectionAdapter {
    pub fn new(store: Arc<dyn DocumentStore>, config: CollectionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    fn record_path(&self, id: &str) -> Result<String> {
        Ok(child_path(&self.config.name, key("record id", id)?))
    }

    fn children(&self, tree: Option<Value>) -> Result<Map<String, Value>> {
        match tree {
            Some(Value::Object(children)) => Ok(children),
            Some(Value::Null) | None => Ok(Map::new()),
            Some(_) => Err(AdapterError::new(format!(
                "collection '{}' is not a keyed set of records",
                self.config.name
            ))),
        }
    }

    /// Read the collection (or its equality-filtered subset) in store key order.
    ///
    /// A filter matches by the field's JSON text, so `"2"` finds both the
    /// string `"2"` and the number `2`.
    async fn read_records(&self, filter: Option<&FieldFilter>) -> Result<Vec<Record>> {
        let path = &self.config.name;
        let log_failure = |e: StoreError| {
            tracing::warn!(collection = %path, error = %e, "Collection read failed");
            AdapterError::from(e)
        };

        let children = match filter {
            Some(filter) => {
                let mut matched = Map::new();
                for value in filter.query_values() {
                    let tree = self
                        .store
                        .query_equal(path, &filter.field, &value)
                        .await
                        .map_err(log_failure)?;
                    matched.extend(self.children(tree)?);
                }
                matched
            }
            None => self.children(self.store.read(path).await.map_err(log_failure)?)?,
        };

        let mut records = Vec::with_capacity(children.len());
        for (id, document) in children {
            match Record::from_document(id, document, path) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // Skip records that can't be decoded
                    tracing::warn!(collection = %path, error = %e, "Skipping malformed record");
                }
            }
        }
        if let Some(filter) = filter {
            records.retain(|r| filter.matches(r));
        }
        Ok(records)
    }

    /// Fetch one page.
    ///
    /// Reads the (filtered) collection, orders it per `query.order`, applies
    /// the free-text search, then slices the page. `total_count` is the
    /// filtered count before slicing.
    pub async fn fetch_page(&self, query: &PageQuery) -> Result<Page> {
        let mut records = self.read_records(query.filter.as_ref()).await?;
        query.order.apply(&mut records);

        if let Some(needle) = query.search.as_deref() {
            let fields = self.search_fields(&records);
            records.retain(|r| paging::matches_search(r, &fields, needle));
        }

        let total_count = records.len();
        let records = paging::paginate(records, query.page, query.page_size);

        tracing::debug!(
            collection = %self.config.name,
            page = query.page,
            returned = records.len(),
            total = total_count,
            "Fetched page"
        );

        Ok(Page {
            records,
            total_count,
        })
    }

    fn search_fields(&self, records: &[Record]) -> Vec<FieldName> {
        if !self.config.search_fields.is_empty() {
            return self.config.search_fields.clone();
        }
        let mut all: Vec<FieldName> = records
            .iter()
            .flat_map(|r| r.fields.keys().cloned())
            .collect();
        all.sort();
        all.dedup();
        all
    }

    /// Total record count plus a tally of `type_field` values.
    ///
    /// Records without the field count toward the total only. An empty
    /// collection yields zero and an empty map.
    pub async fn fetch_counts(&self, type_field: Option<&str>) -> Result<Counts> {
        let records = self.read_records(None).await?;

        let mut counts = Counts {
            total_count: records.len(),
            counts_by_type: BTreeMap::new(),
        };
        if let Some(field) = type_field {
            for record in &records {
                if let Some(kind) = record.field_text(field) {
                    *counts.counts_by_type.entry(kind).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }

    /// Store a new record under a generated key with empty likes and comments.
    pub async fn create(&self, fields: Fields) -> Result<Record> {
        let fields = strip_reserved(fields);
        let mut document = fields.clone();
        document.insert("likes".into(), Value::Object(Map::new()));
        document.insert("comments".into(), Value::Object(Map::new()));

        let id = self
            .store
            .push(&self.config.name, Value::Object(document))
            .await?;

        tracing::info!(collection = %self.config.name, id = %id, "Created record");
        Ok(Record::new(id, fields))
    }

    /// Set every given field on the record, leaving likes and comments alone.
    ///
    /// Returns false without writing anything when the record does not exist.
    pub async fn update(&self, id: &str, fields: Fields) -> Result<bool> {
        let path = self.record_path(id)?;
        if self.store.read(&path).await?.is_none() {
            tracing::debug!(collection = %self.config.name, id = %id, "Update of missing record ignored");
            return Ok(false);
        }

        self.store.merge(&path, strip_reserved(fields)).await?;
        tracing::info!(collection = %self.config.name, id = %id, "Updated record");
        Ok(true)
    }

    pub async fn delete_one(&self, id: &str) -> Result<()> {
        self.store.delete(&self.record_path(id)?).await?;
        tracing::info!(collection = %self.config.name, id = %id, "Deleted record");
        Ok(())
    }

    /// Remove the whole collection subtree.
    pub async fn delete_all(&self) -> Result<()> {
        if segments(&self.config.name).is_empty() {
            return Err(AdapterError::new("refusing to delete the store root"));
        }
        self.store.delete(&self.config.name).await?;
        tracing::info!(collection = %self.config.name, "Deleted all records");
        Ok(())
    }

    /// Flip `actor`'s like on the record. Returns whether it is liked afterwards.
    pub async fn toggle_like(&self, id: &str, actor: &str) -> Result<bool> {
        let likes = child_path(&self.record_path(id)?, "likes");
        let path = child_path(&likes, key("actor", actor)?);
        let liked = match self.store.read(&path).await? {
            Some(_) => {
                self.store.delete(&path).await?;
                false
            }
            None => {
                self.store.write(&path, Value::Bool(true)).await?;
                true
            }
        };
        tracing::debug!(collection = %self.config.name, id = %id, actor = %actor, liked, "Toggled like");
        Ok(liked)
    }

    /// Append a comment under a generated key.
    pub async fn add_comment(
        &self,
        id: &str,
        actor_name: &str,
        text: &str,
    ) -> Result<(CommentId, Comment)> {
        let comments = child_path(&self.record_path(id)?, "comments");
        let comment = Comment::new(actor_name, text);
        let value = serde_json::to_value(&comment).map_err(|e| AdapterError::new(e.to_string()))?;
        let comment_id = self.store.push(&comments, value).await?;
        tracing::debug!(collection = %self.config.name, id = %id, comment = %comment_id, "Added comment");
        Ok((comment_id, comment))
    }
}
