//! Error types for the Folio engine.

use crate::FieldName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Schema invariant violations, reported when a schema is checked.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no fields")]
    Empty,

    #[error("invalid field name: {0:?}")]
    InvalidFieldName(FieldName),

    #[error("reserved field name: {0}")]
    ReservedFieldName(FieldName),

    #[error("duplicate field: {0}")]
    DuplicateField(FieldName),

    #[error("nested group '{0}' may not contain another nested group")]
    NestedGroupTooDeep(FieldName),

    #[error("nested group '{0}' has no sub-fields")]
    EmptyGroup(FieldName),

    #[error("select field '{0}' has no options")]
    MissingOptions(FieldName),
}

/// A single field's validation failure.
///
/// Produced and consumed entirely by the form engine; never reaches a store.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldError {
    #[error("required")]
    #[serde(rename = "required")]
    Required,

    #[error("invalid email")]
    #[serde(rename = "invalid email")]
    InvalidEmail,

    #[error("invalid option")]
    #[serde(rename = "invalid option")]
    InvalidOption,

    #[error("invalid number")]
    #[serde(rename = "invalid number")]
    InvalidNumber,
}

/// Field errors keyed by field name (`group[index].sub` for group members).
pub type FieldErrors = BTreeMap<String, FieldError>;

/// Misuse of a draft's editing entry points.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field: {0}")]
    UnknownField(FieldName),

    #[error("field '{0}' is not a nested group")]
    NotAGroup(FieldName),

    #[error("field '{0}' does not accept files")]
    NotAFileField(FieldName),

    #[error("group '{field}' has no item at index {index}")]
    GroupIndexOutOfRange { field: FieldName, index: usize },

    #[error("no record is being edited")]
    NotEditing,
}

/// Outcome of a failed submit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Local validation failed; the submit handler was not invoked.
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(FieldErrors),

    /// The submit handler rejected the submission.
    #[error("{0}")]
    Handler(String),

    #[error(transparent)]
    Form(#[from] FormError),
}

/// Failures of the hierarchical document store contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected request at '{path}': {reason}")]
    Rejected { path: String, reason: String },

    #[error("malformed document at '{path}': {reason}")]
    Malformed { path: String, reason: String },
}

/// Failures of the blob upload contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("blob storage unavailable: {0}")]
    Unavailable(String),

    #[error("upload of '{path}' rejected: {reason}")]
    Rejected { path: String, reason: String },
}

/// The single error surfaced by the collection adapter.
///
/// Callers never inspect its internals; the message is forwarded as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct AdapterError {
    pub message: String,
}

impl AdapterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_key(what: &str, value: &str) -> Self {
        Self::new(format!("invalid {} '{}'", what, value))
    }
}

impl From<StoreError> for AdapterError {
    fn from(err: StoreError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<BlobError> for AdapterError {
    fn from(err: BlobError) -> Self {
        Self::new(err.to_string())
    }
}

/// Result type for adapter and manager operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SchemaError::NestedGroupTooDeep("chapters".into());
        assert_eq!(
            err.to_string(),
            "nested group 'chapters' may not contain another nested group"
        );

        assert_eq!(FieldError::Required.to_string(), "required");
        assert_eq!(FieldError::InvalidEmail.to_string(), "invalid email");
        assert_eq!(
            serde_json::to_value(FieldError::InvalidOption).unwrap(),
            serde_json::json!("invalid option")
        );

        let err = FormError::GroupIndexOutOfRange {
            field: "lessons".into(),
            index: 3,
        };
        assert_eq!(err.to_string(), "group 'lessons' has no item at index 3");
    }

    #[test]
    fn adapter_error_keeps_store_message() {
        let err: AdapterError = StoreError::Unavailable("connection refused".into()).into();
        assert_eq!(err.message, "store unavailable: connection refused");
        assert_eq!(err.to_string(), err.message);
    }

    #[test]
    fn submit_error_counts_fields() {
        let mut errors = FieldErrors::new();
        errors.insert("title".into(), FieldError::Required);
        errors.insert("email".into(), FieldError::InvalidEmail);
        assert_eq!(
            SubmitError::Invalid(errors).to_string(),
            "2 field(s) failed validation"
        );
    }
}
