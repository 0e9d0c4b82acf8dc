//! # Folio Engine
//!
//! Schema-driven content administration over a hierarchical document store.
//!
//! The crate pairs a generic resource manager, which turns any named
//! collection of remote records into a CRUD + pagination + count state
//! machine, with a form engine and a browse engine that edit and list
//! arbitrary record shapes described by a declarative field schema.
//!
//! ## Design Principles
//!
//! - **IO behind traits**: all remote access goes through [`DocumentStore`]
//!   and [`BlobStore`]; in-memory implementations ship with the crate
//! - **Configuration, not code**: business shapes (poems, books, courses)
//!   are [`FieldSchema`] + [`CollectionConfig`] values
//! - **Extensible kinds**: field behaviour lives in a [`KindRegistry`] of
//!   [`FieldKindHandler`]s
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is a field map with a store-assigned id and two reserved
//! subresource maps, `likes` (actor → true) and `comments`.
//!
//! ### Resource Manager
//!
//! [`ResourceManager`] wraps a [`CollectionAdapter`] and keeps a
//! [`ResourceState`] with a `loading → succeeded | failed` lifecycle and a
//! status message per operation.
//!
//! ### Forms and lists
//!
//! [`FormEngine`] owns a draft, validates on every edit and hands normalised
//! values to a submit handler. [`BrowseEngine`] filters and pages records,
//! builds card and table view models and emits [`BrowseIntent`]s.
//!
//! ## Quick Start
//!
//! ```rust
//! use folio_engine::{FieldDescriptor, FieldSchema, FormEngine, SelectOption, SubmitError};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! // 1. Describe the record shape
//! let schema = FieldSchema::new(vec![
//!     FieldDescriptor::text("title", "Title").required(),
//!     FieldDescriptor::select(
//!         "type",
//!         "Type",
//!         vec![SelectOption::new("Story", "story"), SelectOption::new("Novel", "novel")],
//!     ),
//! ])
//! .unwrap();
//!
//! // 2. Edit a draft
//! let mut form = FormEngine::new(Arc::new(schema));
//! form.set_value("type", json!("story")).unwrap();
//!
//! // 3. Missing required values block the submission
//! assert!(matches!(form.prepare(), Err(SubmitError::Invalid(_))));
//!
//! form.set_value("title", json!("  The Lottery ")).unwrap();
//! let submission = form.prepare().unwrap();
//! assert_eq!(submission.values["title"], json!("The Lottery"));
//! ```

pub mod adapter;
pub mod blob;
pub mod browse;
pub mod error;
pub mod form;
pub mod kind;
pub mod manager;
pub mod paging;
pub mod record;
pub mod schema;
pub mod state;
pub mod store;
pub mod validate;

// Re-export main types at crate root
pub use adapter::{CollectionAdapter, CollectionConfig, Counts};
pub use blob::{BlobStore, MemoryBlobStore};
pub use browse::{
    BrowseConfig, BrowseEngine, BrowseIntent, Card, FilterButton, Modal, Pagination, RenderMode,
    Table,
};
pub use error::{
    AdapterError, BlobError, FieldError, FieldErrors, FormError, SchemaError, StoreError,
    SubmitError,
};
pub use form::{Draft, FieldWidget, FormEngine, PendingUpload, Submission, SubmitMode};
pub use kind::{FieldKindHandler, KindRegistry};
pub use manager::ResourceManager;
pub use paging::{FieldFilter, Page, PageQuery, RecencyPolicy, DEFAULT_PAGE_SIZE};
pub use record::{Comment, Fields, Record};
pub use schema::{
    is_path_segment, FieldDescriptor, FieldKind, FieldSchema, MediaType, SelectOption,
};
pub use state::{Lifecycle, OperationKind, ResourceState};
pub use store::{DocumentStore, MemoryStore};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionName = String;
pub type FieldName = String;
pub type CommentId = String;
pub type ActorKey = String;
