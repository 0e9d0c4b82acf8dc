//! Generic resource manager.
//!
//! One [`ResourceManager`] per collection instance wraps a
//! [`CollectionAdapter`] and keeps a [`ResourceState`] current. Operations take
//! `&self` so several can be in flight at once (a count and a page fetch, for
//! example); each one updates the state when it settles, so the most recently
//! settled operation decides the visible lifecycle. Stale responses are not
//! discarded: last response wins.

use crate::adapter::{CollectionAdapter, CollectionConfig, Counts};
use crate::browse::BrowseIntent;
use crate::error::{AdapterError, Result};
use crate::paging::{Page, PageQuery};
use crate::record::{Comment, Fields};
use crate::state::{OperationKind, ResourceState};
use crate::store::DocumentStore;
use crate::{CommentId, Record};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// CRUD, pagination and count state machine for one collection.
#[derive(Debug)]
pub struct ResourceManager {
    adapter: CollectionAdapter,
    state: Mutex<ResourceState>,
}

impl ResourceManager {
    pub fn new(adapter: CollectionAdapter) -> Self {
        Self {
            adapter,
            state: Mutex::new(ResourceState::new()),
        }
    }

    /// Manager for `config` backed by `store`.
    pub fn for_store(store: Arc<dyn DocumentStore>, config: CollectionConfig) -> Self {
        Self::new(CollectionAdapter::new(store, config))
    }

    pub fn config(&self) -> &CollectionConfig {
        self.adapter.config()
    }

    pub fn adapter(&self) -> &CollectionAdapter {
        &self.adapter
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ResourceState {
        self.with_state(|state| state.clone())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ResourceState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    async fn run<T, Fut>(
        &self,
        kind: OperationKind,
        operation: Fut,
        on_success: impl FnOnce(&mut ResourceState, &T),
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let collection = &self.config().name;
        let label = &self.config().label;
        self.with_state(|state| state.begin(kind, label));
        tracing::debug!(collection = %collection, operation = ?kind, "Operation pending");

        match operation.await {
            Ok(value) => {
                self.with_state(|state| {
                    on_success(state, &value);
                    state.succeed();
                });
                tracing::debug!(collection = %collection, operation = ?kind, "Operation succeeded");
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(collection = %collection, operation = ?kind, error = %err, "Operation failed");
                self.with_state(|state| state.fail(err.message.clone()));
                Err(err)
            }
        }
    }

    /// Refresh the total and per-type tallies.
    pub async fn fetch_counts(&self) -> Result<Counts> {
        let type_field = self.config().type_field.clone();
        self.run(
            OperationKind::FetchCounts,
            self.adapter.fetch_counts(type_field.as_deref()),
            |state, counts| state.apply_counts(counts),
        )
        .await
    }

    /// Fetch a page and replace the cached items with it.
    pub async fn fetch_page(&self, query: PageQuery) -> Result<Page> {
        self.run(
            OperationKind::FetchPage,
            self.adapter.fetch_page(&query),
            |state, page| state.apply_page(page),
        )
        .await
    }

    /// Page fetch in screen terms: 1-based page, optional type value and
    /// search text. A type value needs a configured type field.
    pub async fn fetch(
        &self,
        page: usize,
        page_size: usize,
        type_value: Option<&str>,
        search: Option<&str>,
    ) -> Result<Page> {
        let mut query = PageQuery::new(page, page_size);
        if let Some(value) = type_value {
            let field = self.config().type_field.clone().ok_or_else(|| {
                AdapterError::new(format!("{} have no type field", self.config().label))
            })?;
            query = query.with_filter(field, value);
        }
        if let Some(text) = search {
            query = query.with_search(text);
        }
        self.fetch_page(query).await
    }

    /// Create a record and append it to the cached items.
    pub async fn create(&self, fields: Fields) -> Result<Record> {
        self.run(
            OperationKind::Create,
            self.adapter.create(fields),
            |state, record| state.apply_created(record.clone()),
        )
        .await
    }

    /// Create records one at a time.
    ///
    /// Stops at the first failure and returns it; records created before the
    /// failure stay persisted and cached.
    pub async fn create_many(&self, batch: Vec<Fields>) -> Result<Vec<Record>> {
        let total = batch.len();
        let mut created = Vec::with_capacity(total);
        for (index, fields) in batch.into_iter().enumerate() {
            match self.create(fields).await {
                Ok(record) => created.push(record),
                Err(err) => {
                    tracing::warn!(
                        collection = %self.config().name,
                        index,
                        created = created.len(),
                        total,
                        "Bulk create stopped"
                    );
                    return Err(err);
                }
            }
        }
        Ok(created)
    }

    /// Merge fields into a record. Returns whether the record existed; unknown
    /// ids change neither the store nor the cache.
    pub async fn update(&self, id: &str, fields: Fields) -> Result<bool> {
        let cached = fields.clone();
        self.run(
            OperationKind::Update,
            self.adapter.update(id, fields),
            |state, existed| {
                if *existed {
                    state.apply_updated(id, cached);
                }
            },
        )
        .await
    }

    pub async fn delete_one(&self, id: &str) -> Result<()> {
        self.run(
            OperationKind::DeleteOne,
            self.adapter.delete_one(id),
            |state, _| {
                state.apply_deleted(id);
            },
        )
        .await
    }

    pub async fn delete_all(&self) -> Result<()> {
        self.run(
            OperationKind::DeleteAll,
            self.adapter.delete_all(),
            |state, _| state.apply_deleted_all(),
        )
        .await
    }

    /// Flip `actor`'s like. Only the targeted record's likes change.
    pub async fn toggle_like(&self, id: &str, actor: &str) -> Result<bool> {
        match self.adapter.toggle_like(id, actor).await {
            Ok(liked) => {
                self.with_state(|state| state.apply_like(id, actor, liked));
                Ok(liked)
            }
            Err(err) => {
                self.with_state(|state| state.note_error(err.message.clone()));
                Err(err)
            }
        }
    }

    pub async fn add_comment(
        &self,
        id: &str,
        actor_name: &str,
        text: &str,
    ) -> Result<(CommentId, Comment)> {
        match self.adapter.add_comment(id, actor_name, text).await {
            Ok((comment_id, comment)) => {
                self.with_state(|state| {
                    state.apply_comment(id, comment_id.clone(), comment.clone())
                });
                Ok((comment_id, comment))
            }
            Err(err) => {
                self.with_state(|state| state.note_error(err.message.clone()));
                Err(err)
            }
        }
    }

    /// Carry out an intent raised by the browse engine.
    pub async fn apply(&self, intent: BrowseIntent) -> Result<()> {
        match intent {
            BrowseIntent::ToggleLike { id, actor } => {
                self.toggle_like(&id, &actor).await.map(|_| ())
            }
            BrowseIntent::AddComment {
                id,
                actor_name,
                text,
            } => self.add_comment(&id, &actor_name, &text).await.map(|_| ()),
            BrowseIntent::Delete { id } => self.delete_one(&id).await,
            BrowseIntent::DeleteAll => self.delete_all().await,
        }
    }
}
