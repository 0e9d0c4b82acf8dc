//! List/browse engine.
//!
//! Turns a set of records into what a list screen shows: the current page,
//! type filter buttons, card or table view models and a detail/edit modal.
//! User actions that change remote data are returned as [`BrowseIntent`]
//! values for a [`ResourceManager`](crate::ResourceManager) to apply.

use crate::error::{FormError, SubmitError};
use crate::form::{FormEngine, Submission};
use crate::kind::KindRegistry;
use crate::paging::{self, FieldFilter, PageQuery, DEFAULT_PAGE_SIZE};
use crate::schema::{FieldSchema, RESERVED_KEYS};
use crate::state::ResourceState;
use crate::{ActorKey, FieldName, Record, RecordId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

/// Label of the filter button that clears the type filter.
pub const ALL_TYPES_LABEL: &str = "All types";

/// Where pagination and filtering happen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pagination {
    /// Items handed to the engine are already the requested page
    Server,
    /// Items are the whole collection; filter and slice locally
    #[default]
    Client,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Cards,
    Table,
}

/// A change the list screen asks the resource manager to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BrowseIntent {
    #[serde(rename_all = "camelCase")]
    ToggleLike { id: RecordId, actor: ActorKey },
    #[serde(rename_all = "camelCase")]
    AddComment {
        id: RecordId,
        actor_name: String,
        text: String,
    },
    Delete { id: RecordId },
    DeleteAll,
}

/// List screen settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowseConfig {
    /// Fields searched by free text; empty searches every field
    pub search_fields: Vec<FieldName>,
    pub type_field: Option<FieldName>,
    pub page_size: usize,
    pub pagination: Pagination,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            search_fields: Vec::new(),
            type_field: None,
            page_size: DEFAULT_PAGE_SIZE,
            pagination: Pagination::Client,
        }
    }
}

/// One type filter button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterButton {
    pub label: String,
    /// `None` for "All types"
    pub value: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardField {
    pub name: FieldName,
    pub label: String,
    pub display: String,
}

/// Card view model for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: RecordId,
    pub fields: Vec<CardField>,
    pub like_count: usize,
    pub liked: bool,
    pub comment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub id: RecordId,
    pub cells: Vec<String>,
}

/// Table view model: schema labels as headers, display strings as cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// Detail/edit modal state.
#[derive(Debug, Clone, Default)]
pub enum Modal {
    #[default]
    Closed,
    Viewing(RecordId),
    Editing { id: RecordId, form: Box<FormEngine> },
}

/// Browse state for one collection screen.
#[derive(Debug, Clone)]
pub struct BrowseEngine {
    schema: Arc<FieldSchema>,
    registry: Arc<KindRegistry>,
    config: BrowseConfig,
    items: Vec<Record>,
    server_total: usize,
    page: usize,
    search: String,
    type_filter: Option<String>,
    render_mode: RenderMode,
    modal: Modal,
    viewer: Option<ActorKey>,
}

impl BrowseEngine {
    pub fn new(schema: Arc<FieldSchema>, config: BrowseConfig) -> Self {
        Self::with_registry(schema, config, Arc::new(KindRegistry::standard()))
    }

    pub fn with_registry(
        schema: Arc<FieldSchema>,
        config: BrowseConfig,
        registry: Arc<KindRegistry>,
    ) -> Self {
        Self {
            schema,
            registry,
            config,
            items: Vec::new(),
            server_total: 0,
            page: 1,
            search: String::new(),
            type_filter: None,
            render_mode: RenderMode::default(),
            modal: Modal::Closed,
            viewer: None,
        }
    }

    /// Set the actor whose likes mark cards as liked.
    pub fn with_viewer(mut self, actor: impl Into<ActorKey>) -> Self {
        self.viewer = Some(actor.into());
        self
    }

    pub fn config(&self) -> &BrowseConfig {
        &self.config
    }

    /// Replace the items. In server mode `total_count` is the manager's
    /// post-filter total; client mode ignores it.
    pub fn set_items(&mut self, items: Vec<Record>, total_count: usize) {
        self.items = items;
        self.server_total = total_count;
    }

    /// Load items and total from a resource manager snapshot.
    pub fn sync(&mut self, state: &ResourceState) {
        self.set_items(state.items.clone(), state.total_count);
    }

    pub fn items(&self) -> &[Record] {
        &self.items
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn type_filter(&self) -> Option<&str> {
        self.type_filter.as_deref()
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Change the search text and go back to page 1.
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.page = 1;
    }

    /// Change the type filter (`None` shows all types) and go back to page 1.
    pub fn set_type_filter(&mut self, value: Option<String>) {
        self.type_filter = value;
        self.page = 1;
    }

    /// Switch between cards and table. Page and filters are kept.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    fn filtered(&self) -> Vec<&Record> {
        let all_fields: Vec<String>;
        let fields = if self.config.search_fields.is_empty() {
            all_fields = self
                .schema
                .fields()
                .iter()
                .map(|f| f.name.clone())
                .collect();
            &all_fields
        } else {
            &self.config.search_fields
        };
        let filter = self.type_field_filter();

        self.items
            .iter()
            .filter(|r| filter.as_ref().map_or(true, |f| f.matches(r)))
            .filter(|r| paging::matches_search(r, fields, &self.search))
            .collect()
    }

    fn type_field_filter(&self) -> Option<FieldFilter> {
        let field = self.config.type_field.as_ref()?;
        let value = self.type_filter.as_ref()?;
        Some(FieldFilter::new(field.clone(), value.clone()))
    }

    /// Records on the current page.
    pub fn visible(&self) -> Vec<&Record> {
        match self.config.pagination {
            Pagination::Server => self.items.iter().collect(),
            Pagination::Client => {
                paging::paginate(self.filtered(), self.page, self.config.page_size)
            }
        }
    }

    /// Post-filter, pre-pagination record count.
    pub fn total(&self) -> usize {
        match self.config.pagination {
            Pagination::Server => self.server_total,
            Pagination::Client => self.filtered().len(),
        }
    }

    pub fn page_count(&self) -> usize {
        paging::page_count(self.total(), self.config.page_size)
    }

    /// The query a server-paginated screen sends to its resource manager.
    pub fn query(&self) -> PageQuery {
        let mut query = PageQuery::new(self.page, self.config.page_size).with_search(&self.search);
        query.filter = self.type_field_filter();
        query
    }

    /// "All types" followed by one button per option of the type field.
    pub fn filter_buttons(&self) -> Vec<FilterButton> {
        let Some(field) = self
            .config
            .type_field
            .as_deref()
            .and_then(|name| self.schema.get(name))
        else {
            return Vec::new();
        };

        let mut buttons = vec![FilterButton {
            label: ALL_TYPES_LABEL.to_string(),
            value: None,
            active: self.type_filter.is_none(),
        }];
        buttons.extend(field.options.iter().map(|option| FilterButton {
            label: option.label.clone(),
            value: Some(option.value.clone()),
            active: self.type_filter.as_deref() == Some(option.value.as_str()),
        }));
        buttons
    }

    fn card(&self, record: &Record) -> Card {
        let mut fields: Vec<CardField> = self
            .schema
            .fields()
            .iter()
            .filter_map(|field| {
                let value = record.get(&field.name)?;
                Some(CardField {
                    name: field.name.clone(),
                    label: field.label.clone(),
                    display: self.registry.display(field, value),
                })
            })
            .collect();

        // Fields outside the schema still show, as plain text.
        fields.extend(
            record
                .fields
                .iter()
                .filter(|(name, _)| {
                    !RESERVED_KEYS.contains(&name.as_str()) && self.schema.get(name).is_none()
                })
                .map(|(name, value)| CardField {
                    name: name.clone(),
                    label: name.clone(),
                    display: match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                }),
        );

        Card {
            id: record.id.clone(),
            fields,
            like_count: record.like_count(),
            liked: self
                .viewer
                .as_deref()
                .is_some_and(|actor| record.is_liked_by(actor)),
            comment_count: record.comment_count(),
        }
    }

    /// Cards for the current page.
    pub fn cards(&self) -> Vec<Card> {
        self.visible().into_iter().map(|r| self.card(r)).collect()
    }

    /// Table for the current page.
    pub fn table(&self) -> Table {
        let headers = self.schema.fields().iter().map(|f| f.label.clone()).collect();
        let rows = self
            .visible()
            .into_iter()
            .map(|record| TableRow {
                id: record.id.clone(),
                cells: self
                    .schema
                    .fields()
                    .iter()
                    .map(|field| {
                        record
                            .get(&field.name)
                            .map(|value| self.registry.display(field, value))
                            .unwrap_or_default()
                    })
                    .collect(),
            })
            .collect();
        Table { headers, rows }
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    /// Open the read-only detail view. Returns false when `id` is not loaded.
    pub fn open_detail(&mut self, id: &str) -> bool {
        if self.items.iter().any(|r| r.id == id) {
            self.modal = Modal::Viewing(id.to_string());
            true
        } else {
            false
        }
    }

    /// The record shown in the detail view.
    pub fn detail(&self) -> Option<&Record> {
        match &self.modal {
            Modal::Viewing(id) => self.items.iter().find(|r| &r.id == id),
            _ => None,
        }
    }

    /// Open the edit modal with a form seeded from `record`.
    pub fn begin_edit(&mut self, record: &Record) {
        let mut form = FormEngine::with_registry(self.schema.clone(), self.registry.clone());
        form.begin_edit(record);
        self.modal = Modal::Editing {
            id: record.id.clone(),
            form: Box::new(form),
        };
    }

    /// The edit modal's form.
    pub fn edit_form(&mut self) -> Result<&mut FormEngine, FormError> {
        match &mut self.modal {
            Modal::Editing { form, .. } => Ok(form.as_mut()),
            _ => Err(FormError::NotEditing),
        }
    }

    pub fn close_modal(&mut self) {
        self.modal = Modal::Closed;
    }

    /// Submit the edit modal's form; the modal closes when the handler
    /// succeeds and stays open otherwise.
    pub async fn submit_modal<F, Fut, E>(&mut self, handler: F) -> Result<(), SubmitError>
    where
        F: FnOnce(Submission) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        self.edit_form()?.submit(handler).await?;
        self.modal = Modal::Closed;
        Ok(())
    }

    pub fn toggle_like(&self, id: impl Into<RecordId>, actor: impl Into<ActorKey>) -> BrowseIntent {
        BrowseIntent::ToggleLike {
            id: id.into(),
            actor: actor.into(),
        }
    }

    pub fn add_comment(
        &self,
        id: impl Into<RecordId>,
        actor_name: impl Into<String>,
        text: impl Into<String>,
    ) -> BrowseIntent {
        BrowseIntent::AddComment {
            id: id.into(),
            actor_name: actor_name.into(),
            text: text.into(),
        }
    }

    pub fn delete(&self, id: impl Into<RecordId>) -> BrowseIntent {
        BrowseIntent::Delete { id: id.into() }
    }

    pub fn delete_all(&self) -> BrowseIntent {
        BrowseIntent::DeleteAll
    }
}
