//! Record types for storing content items.

use crate::{error::StoreError, schema::RESERVED_KEYS, ActorKey, CommentId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field values of a record, keyed by field name.
pub type Fields = Map<String, Value>;

/// One entry of a record's `comments` subresource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Display name of the commenter
    pub actor_name: String,
    /// Comment body
    pub text: String,
    /// When the comment was added
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(actor_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            actor_name: actor_name.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// A content item in a collection.
///
/// `likes` and `comments` are independently mutable subresources; everything
/// else lives in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Store key of this record
    pub id: RecordId,
    /// Actors who like this record
    #[serde(default)]
    pub likes: BTreeMap<ActorKey, bool>,
    /// Comments keyed by store-generated id
    #[serde(default)]
    pub comments: BTreeMap<CommentId, Comment>,
    /// Schema field values
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Create a record with empty subresource maps.
    pub fn new(id: impl Into<RecordId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            likes: BTreeMap::new(),
            comments: BTreeMap::new(),
            fields: strip_reserved(fields),
        }
    }

    /// Decode a stored document. The id is the document key, not a field.
    pub fn from_document(id: impl Into<RecordId>, document: Value, path: &str) -> Result<Self, StoreError> {
        let malformed = |reason: String| StoreError::Malformed {
            path: path.to_string(),
            reason,
        };

        let Value::Object(mut map) = document else {
            return Err(malformed("record must be an object".into()));
        };

        let likes = match map.remove("likes") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(value) => serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?,
        };
        let comments = match map.remove("comments") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(value) => serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?,
        };
        map.remove("id");

        Ok(Self {
            id: id.into(),
            likes,
            comments,
            fields: map,
        })
    }

    /// Encode as a stored document (fields plus subresources, without the id).
    pub fn to_document(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert(
            "likes".into(),
            serde_json::to_value(&self.likes).unwrap_or_default(),
        );
        map.insert(
            "comments".into(),
            serde_json::to_value(&self.comments).unwrap_or_default(),
        );
        Value::Object(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Text form of a field for equality filters and tallies.
    pub fn field_text(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn like_count(&self) -> usize {
        self.likes.values().filter(|liked| **liked).count()
    }

    pub fn is_liked_by(&self, actor: &str) -> bool {
        self.likes.get(actor).copied().unwrap_or(false)
    }

    /// Flip `actor`'s like. Returns whether the actor likes the record afterwards.
    pub fn toggle_like(&mut self, actor: &str) -> bool {
        if self.likes.remove(actor).is_some() {
            false
        } else {
            self.likes.insert(actor.to_string(), true);
            true
        }
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Overwrite the given schema fields, keeping the rest along with id and
    /// subresources. Mirrors the store's merge on update.
    pub fn merge_fields(&mut self, fields: Fields) {
        self.fields.extend(strip_reserved(fields));
    }
}

/// Drop the reserved record keys from a field map.
pub fn strip_reserved(mut fields: Fields) -> Fields {
    for key in RESERVED_KEYS {
        fields.remove(key);
    }
    fields
}
