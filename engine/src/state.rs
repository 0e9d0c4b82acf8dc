//! Per-collection resource state and its transitions.
//!
//! Every manager operation moves through `pending -> succeeded | failed`.
//! Transitions are plain methods so the state machine can be driven and
//! tested without a store.

use crate::adapter::Counts;
use crate::paging::Page;
use crate::record::{Comment, Fields};
use crate::{CommentId, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Async lifecycle of the last settled operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Operations that go through the pending/settled lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    FetchCounts,
    FetchPage,
    Create,
    Update,
    DeleteOne,
    DeleteAll,
}

impl OperationKind {
    /// Status text shown while the operation is pending.
    pub fn pending_message(&self, label: &str) -> String {
        match self {
            OperationKind::FetchCounts => format!("Counting {}...", label),
            OperationKind::FetchPage => format!("Loading {}...", label),
            OperationKind::Create => format!("Adding new {}...", label),
            OperationKind::Update => format!("Updating {}...", label),
            OperationKind::DeleteOne => format!("Deleting {}...", label),
            OperationKind::DeleteAll => format!("Deleting all {}...", label),
        }
    }
}

/// State of one collection instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceState {
    pub items: Vec<Record>,
    pub total_count: usize,
    pub counts_by_type: BTreeMap<String, usize>,
    pub lifecycle: Lifecycle,
    pub status_message: String,
    pub last_error: Option<String>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `loading` with the operation's status text.
    pub fn begin(&mut self, kind: OperationKind, label: &str) {
        self.lifecycle = Lifecycle::Loading;
        self.status_message = kind.pending_message(label);
    }

    /// Settle successfully. Clears the status text and last error.
    pub fn succeed(&mut self) {
        self.lifecycle = Lifecycle::Succeeded;
        self.status_message.clear();
        self.last_error = None;
    }

    /// Settle with a failure. Items and counts are left untouched.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.lifecycle = Lifecycle::Failed;
        self.status_message.clear();
        self.last_error = Some(message.into());
    }

    /// Replace items and total with a fetched page.
    pub fn apply_page(&mut self, page: &Page) {
        self.items = page.records.clone();
        self.total_count = page.total_count;
    }

    pub fn apply_counts(&mut self, counts: &Counts) {
        self.total_count = counts.total_count;
        self.counts_by_type = counts.counts_by_type.clone();
    }

    /// Append a created record. The list is not re-sorted.
    pub fn apply_created(&mut self, record: Record) {
        self.items.push(record);
    }

    /// Merge `fields` into the cached record with `id`, in place.
    ///
    /// Returns false (and changes nothing) when the id is not cached.
    pub fn apply_updated(&mut self, id: &str, fields: Fields) -> bool {
        match self.find_mut(id) {
            Some(record) => {
                record.merge_fields(fields);
                true
            }
            None => false,
        }
    }

    /// Remove the record with `id`; no-op when absent.
    pub fn apply_deleted(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|r| r.id != id);
        self.items.len() != before
    }

    pub fn apply_deleted_all(&mut self) {
        self.items.clear();
        self.total_count = 0;
        self.counts_by_type.clear();
    }

    /// Set `actor`'s like on the cached record to `liked`.
    pub fn apply_like(&mut self, id: &str, actor: &str, liked: bool) -> bool {
        match self.find_mut(id) {
            Some(record) => {
                if liked {
                    record.likes.insert(actor.to_string(), true);
                } else {
                    record.likes.remove(actor);
                }
                true
            }
            None => false,
        }
    }

    pub fn apply_comment(&mut self, id: &str, comment_id: CommentId, comment: Comment) -> bool {
        match self.find_mut(id) {
            Some(record) => {
                record.comments.insert(comment_id, comment);
                true
            }
            None => false,
        }
    }

    /// Record a subresource failure without touching the lifecycle.
    pub fn note_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn find(&self, id: &str) -> Option<&Record> {
        self.items.iter().find(|r| r.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.items.iter_mut().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, title: &str) -> Record {
        Record::new(id, json!({"title": title}).as_object().cloned().unwrap())
    }

    fn loaded() -> ResourceState {
        let mut state = ResourceState::new();
        state.apply_page(&Page {
            records: vec![record("b", "Second"), record("a", "First")],
            total_count: 2,
        });
        state
    }

    #[test]
    fn lifecycle_transitions() {
        let mut state = ResourceState::new();
        assert_eq!(state.lifecycle, Lifecycle::Idle);

        state.begin(OperationKind::Create, "poems");
        assert_eq!(state.lifecycle, Lifecycle::Loading);
        assert_eq!(state.status_message, "Adding new poems...");

        state.fail("boom");
        assert_eq!(state.lifecycle, Lifecycle::Failed);
        assert!(state.status_message.is_empty());
        assert_eq!(state.last_error.as_deref(), Some("boom"));

        state.begin(OperationKind::FetchPage, "poems");
        state.succeed();
        assert_eq!(state.lifecycle, Lifecycle::Succeeded);
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn update_in_place_keeps_order_and_likes() {
        let mut state = loaded();
        state.apply_like("a", "ada", true);

        let changed = state.apply_updated("a", json!({"title": "Renamed"}).as_object().cloned().unwrap());
        assert!(changed);
        assert_eq!(state.items[1].id, "a");
        assert_eq!(state.items[1].fields["title"], json!("Renamed"));
        assert!(state.items[1].is_liked_by("ada"));
    }

    #[test]
    fn update_keeps_fields_outside_the_payload() {
        let mut state = loaded();
        state.items[1].fields.insert("author".into(), json!("Ada"));

        state.apply_updated("a", json!({"title": "Renamed"}).as_object().cloned().unwrap());
        assert_eq!(state.items[1].fields["title"], json!("Renamed"));
        assert_eq!(state.items[1].fields["author"], json!("Ada"));
    }

    #[test]
    fn missing_ids_are_noops() {
        let mut state = loaded();
        let before = state.clone();

        assert!(!state.apply_updated("zzz", Fields::new()));
        assert!(!state.apply_deleted("zzz"));
        assert!(!state.apply_like("zzz", "ada", true));
        assert_eq!(state, before);
    }

    #[test]
    fn created_records_are_appended() {
        let mut state = loaded();
        state.apply_created(record("c", "Third"));
        assert_eq!(state.items.last().unwrap().id, "c");
    }

    #[test]
    fn delete_all_resets_counts() {
        let mut state = loaded();
        state.apply_counts(&Counts {
            total_count: 2,
            counts_by_type: BTreeMap::from([("story".to_string(), 2)]),
        });

        state.apply_deleted_all();
        assert!(state.items.is_empty());
        assert_eq!(state.total_count, 0);
        assert!(state.counts_by_type.is_empty());
    }

    #[test]
    fn state_serializes_camel_case() {
        let json = serde_json::to_value(ResourceState::new()).unwrap();
        assert_eq!(json["lifecycle"], json!("idle"));
        assert!(json.get("statusMessage").is_some());
        assert!(json.get("countsByType").is_some());
    }
}
