//! Schema-driven form engine.
//!
//! A [`FormEngine`] owns one [`Draft`]: the values being edited, their
//! field errors and any files selected for upload. Every edit entry point
//! writes the value and re-validates that field. [`FormEngine::submit`]
//! validates everything, hands the normalised values to a caller-supplied
//! handler and resets the draft only when the handler succeeds.

use crate::blob::BlobStore;
use crate::error::{BlobError, FieldError, FieldErrors, FormError, SubmitError};
use crate::kind::{GroupKind, KindRegistry};
use crate::record::Fields;
use crate::schema::{FieldDescriptor, FieldKind, FieldSchema, SelectOption};
use crate::validate::validate_field;
use crate::{FieldName, Record, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Whether a submission creates or edits a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    Add,
    Edit,
}

/// A file chosen in the form but not uploaded yet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for PendingUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What a submit handler receives.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Normalised values for every schema field
    pub values: Fields,
    pub mode: SubmitMode,
    /// Id of the edited record in edit mode
    pub id: Option<RecordId>,
    /// Files still to be uploaded, keyed by field
    pub uploads: BTreeMap<FieldName, PendingUpload>,
}

impl Submission {
    /// Upload every pending file and store the returned URL in its field.
    ///
    /// Files land at `{prefix}/{millis}-{file name}`. Stops at the first
    /// failed upload; fields uploaded before it keep their new URL.
    pub async fn resolve_uploads(
        &mut self,
        blobs: &dyn BlobStore,
        prefix: &str,
    ) -> Result<(), BlobError> {
        let stamp = chrono::Utc::now().timestamp_millis();
        let uploads = std::mem::take(&mut self.uploads);
        let mut remaining = uploads.into_iter();

        while let Some((field, upload)) = remaining.next() {
            let path = format!(
                "{}/{}-{}",
                prefix.trim_end_matches('/'),
                stamp,
                upload.file_name
            );
            match blobs
                .upload(&path, upload.bytes.clone(), &upload.content_type)
                .await
            {
                Ok(url) => {
                    tracing::debug!(field = %field, path = %path, "Uploaded file");
                    self.values.insert(field, Value::String(url));
                }
                Err(err) => {
                    self.uploads.insert(field, upload);
                    self.uploads.extend(remaining);
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

/// Transient edit state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub values: Fields,
    pub field_errors: FieldErrors,
    pub pending_uploads: BTreeMap<FieldName, PendingUpload>,
    pub submit_error: Option<String>,
}

/// Render model of one form field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldWidget {
    pub name: FieldName,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FieldError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    /// Name of a selected, not yet uploaded file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_file: Option<String>,
    /// Sub-field widgets per group item
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Vec<FieldWidget>>,
}

/// Edits one record shaped by a [`FieldSchema`].
#[derive(Debug, Clone)]
pub struct FormEngine {
    schema: Arc<FieldSchema>,
    registry: Arc<KindRegistry>,
    editing: Option<RecordId>,
    draft: Draft,
}

impl FormEngine {
    /// A form in add mode with every field at its default.
    pub fn new(schema: Arc<FieldSchema>) -> Self {
        Self::with_registry(schema, Arc::new(KindRegistry::standard()))
    }

    pub fn with_registry(schema: Arc<FieldSchema>, registry: Arc<KindRegistry>) -> Self {
        let mut form = Self {
            schema,
            registry,
            editing: None,
            draft: Draft::default(),
        };
        form.draft.values = form.default_values();
        form
    }

    /// A form in edit mode seeded from `record`.
    pub fn editing(schema: Arc<FieldSchema>, record: &Record) -> Self {
        let mut form = Self::new(schema);
        form.begin_edit(record);
        form
    }

    /// Also require the named fields, on top of the schema's own flags.
    pub fn with_required_fields(mut self, names: &[&str]) -> Self {
        let schema = (*self.schema).clone().with_required(names);
        self.schema = Arc::new(schema);
        self
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn values(&self) -> &Fields {
        &self.draft.values
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.draft.values.get(name)
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.draft.field_errors
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.draft.submit_error.as_deref()
    }

    pub fn mode(&self) -> SubmitMode {
        if self.editing.is_some() {
            SubmitMode::Edit
        } else {
            SubmitMode::Add
        }
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    fn default_values(&self) -> Fields {
        self.schema
            .fields()
            .iter()
            .map(|f| (f.name.clone(), self.registry.default_value(f)))
            .collect()
    }

    /// Switch to edit mode and seed the draft from `record`.
    ///
    /// Fields the record lacks start at their kind's default; group items
    /// get defaults for missing sub-fields.
    pub fn begin_edit(&mut self, record: &Record) {
        let mut values = Fields::new();
        for field in self.schema.fields() {
            let value = match record.get(&field.name) {
                Some(Value::Null) | None => self.registry.default_value(field),
                Some(existing) if field.kind == FieldKind::NestedGroup => {
                    self.seed_group(field, existing)
                }
                Some(existing) => existing.clone(),
            };
            values.insert(field.name.clone(), value);
        }

        self.editing = Some(record.id.clone());
        self.draft = Draft {
            values,
            ..Draft::default()
        };
    }

    fn seed_group(&self, field: &FieldDescriptor, existing: &Value) -> Value {
        let Some(items) = existing.as_array() else {
            return self.registry.default_value(field);
        };
        let seeded = items
            .iter()
            .map(|item| {
                let mut out = Map::new();
                for sub in &field.sub_fields {
                    let value = item
                        .get(&sub.name)
                        .filter(|v| !v.is_null())
                        .cloned()
                        .unwrap_or_else(|| self.registry.default_value(sub));
                    out.insert(sub.name.clone(), value);
                }
                Value::Object(out)
            })
            .collect();
        Value::Array(seeded)
    }

    /// Back to add mode with a fresh draft.
    pub fn reset(&mut self) {
        self.editing = None;
        self.draft = Draft {
            values: self.default_values(),
            ..Draft::default()
        };
    }

    /// Abandon the current edit.
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn field(&self, name: &str) -> Result<FieldDescriptor, FormError> {
        self.schema
            .get(name)
            .cloned()
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    fn group(&self, name: &str) -> Result<FieldDescriptor, FormError> {
        let field = self.field(name)?;
        if field.kind != FieldKind::NestedGroup {
            return Err(FormError::NotAGroup(name.to_string()));
        }
        Ok(field)
    }

    fn group_items_mut(&mut self, name: &str) -> &mut Vec<Value> {
        let slot = self
            .draft
            .values
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => items,
            _ => unreachable!("slot was just made an array"),
        }
    }

    /// Write a top-level field value and re-validate it.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), FormError> {
        let field = self.field(name)?;
        self.draft.values.insert(field.name.clone(), value);
        self.revalidate(&field);
        Ok(())
    }

    /// Write one sub-field of one group item and re-validate the group.
    pub fn set_group_value(
        &mut self,
        group: &str,
        index: usize,
        sub_field: &str,
        value: Value,
    ) -> Result<(), FormError> {
        let field = self.group(group)?;
        if field.sub_field(sub_field).is_none() {
            return Err(FormError::UnknownField(format!("{}.{}", group, sub_field)));
        }

        let items = self.group_items_mut(group);
        let item = items
            .get_mut(index)
            .ok_or_else(|| FormError::GroupIndexOutOfRange {
                field: group.to_string(),
                index,
            })?;
        if !item.is_object() {
            *item = Value::Object(Map::new());
        }
        if let Value::Object(map) = item {
            map.insert(sub_field.to_string(), value);
        }

        self.revalidate(&field);
        Ok(())
    }

    /// Append an empty item to a group. Returns the new item's index.
    pub fn add_group_item(&mut self, group: &str) -> Result<usize, FormError> {
        let field = self.group(group)?;
        let empty = GroupKind::empty_item(&field, &self.registry);
        let items = self.group_items_mut(group);
        items.push(empty);
        let index = items.len() - 1;
        self.revalidate(&field);
        Ok(index)
    }

    /// Remove a group item by index.
    pub fn remove_group_item(&mut self, group: &str, index: usize) -> Result<(), FormError> {
        let field = self.group(group)?;
        let items = self.group_items_mut(group);
        if index >= items.len() {
            return Err(FormError::GroupIndexOutOfRange {
                field: group.to_string(),
                index,
            });
        }
        items.remove(index);
        self.revalidate(&field);
        Ok(())
    }

    /// Select a file for an upload field. The upload happens at submit time.
    pub fn select_file(&mut self, name: &str, upload: PendingUpload) -> Result<(), FormError> {
        let field = self.field(name)?;
        if !field.kind.is_upload() {
            return Err(FormError::NotAFileField(name.to_string()));
        }
        self.draft.pending_uploads.insert(field.name.clone(), upload);
        self.revalidate(&field);
        Ok(())
    }

    /// Drop a selected file, keeping any previously stored URL.
    pub fn clear_file(&mut self, name: &str) -> Result<(), FormError> {
        let field = self.field(name)?;
        if !field.kind.is_upload() {
            return Err(FormError::NotAFileField(name.to_string()));
        }
        self.draft.pending_uploads.remove(name);
        self.revalidate(&field);
        Ok(())
    }

    fn check(&self, field: &FieldDescriptor) -> Vec<(String, FieldError)> {
        let value = self.draft.values.get(&field.name);

        if field.kind != FieldKind::NestedGroup {
            let has_upload = self.draft.pending_uploads.contains_key(&field.name);
            return match validate_field(&self.registry, field, value, has_upload) {
                Ok(()) => Vec::new(),
                Err(err) => vec![(field.name.clone(), err)],
            };
        }

        let items = value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
        if items.is_empty() {
            return if field.required {
                vec![(field.name.clone(), FieldError::Required)]
            } else {
                Vec::new()
            };
        }

        let mut errors = Vec::new();
        for (index, item) in items.iter().enumerate() {
            for sub in &field.sub_fields {
                if let Err(err) = validate_field(&self.registry, sub, item.get(&sub.name), false) {
                    errors.push((format!("{}[{}].{}", field.name, index, sub.name), err));
                }
            }
        }
        errors
    }

    fn revalidate(&mut self, field: &FieldDescriptor) {
        let group_prefix = format!("{}[", field.name);
        self.draft
            .field_errors
            .retain(|key, _| key != &field.name && !key.starts_with(&group_prefix));
        let errors = self.check(field);
        self.draft.field_errors.extend(errors);
    }

    /// Validate every field, store the errors and return them.
    pub fn validate_all(&mut self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for field in self.schema.fields() {
            errors.extend(self.check(field));
        }
        self.draft.field_errors = errors.clone();
        errors
    }

    fn normalized_values(&self) -> Result<Fields, FieldErrors> {
        let mut out = Fields::new();
        let mut errors = FieldErrors::new();
        for field in self.schema.fields() {
            let raw = self
                .draft
                .values
                .get(&field.name)
                .cloned()
                .unwrap_or_else(|| self.registry.default_value(field));
            match self.registry.normalize(field, raw) {
                Ok(value) => {
                    out.insert(field.name.clone(), value);
                }
                Err(err) => {
                    errors.insert(field.name.clone(), err);
                }
            }
        }
        if errors.is_empty() {
            Ok(out)
        } else {
            Err(errors)
        }
    }

    /// Validate and build the submission without invoking any handler.
    ///
    /// The draft is not modified apart from its field errors, so preparing an
    /// unchanged valid draft twice yields equal submissions.
    pub fn prepare(&mut self) -> Result<Submission, SubmitError> {
        let errors = self.validate_all();
        if !errors.is_empty() {
            return Err(SubmitError::Invalid(errors));
        }

        let values = self.normalized_values().map_err(|errors| {
            self.draft.field_errors = errors.clone();
            SubmitError::Invalid(errors)
        })?;

        Ok(Submission {
            values,
            mode: self.mode(),
            id: self.editing.clone(),
            uploads: self.draft.pending_uploads.clone(),
        })
    }

    /// Settle a submission prepared by [`FormEngine::prepare`].
    ///
    /// Success resets the draft (back to add mode); failure records the
    /// submit error and keeps the draft for another attempt.
    pub fn complete(&mut self, outcome: Result<(), String>) -> Result<(), SubmitError> {
        match outcome {
            Ok(()) => {
                self.reset();
                Ok(())
            }
            Err(message) => {
                self.draft.submit_error = Some(message.clone());
                Err(SubmitError::Handler(message))
            }
        }
    }

    /// Validate, then pass the submission to `handler`.
    ///
    /// Invalid drafts never reach the handler.
    pub async fn submit<F, Fut, E>(&mut self, handler: F) -> Result<(), SubmitError>
    where
        F: FnOnce(Submission) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        self.draft.submit_error = None;
        let submission = self.prepare()?;
        let outcome = handler(submission).await.map_err(|e| e.to_string());
        if let Err(message) = &outcome {
            tracing::warn!(error = %message, "Submit handler failed");
        }
        self.complete(outcome)
    }

    /// Render models for every field in schema order.
    pub fn widgets(&self) -> Vec<FieldWidget> {
        self.schema
            .fields()
            .iter()
            .map(|field| {
                let value = self.draft.values.get(&field.name).cloned().unwrap_or_default();
                let items = if field.kind == FieldKind::NestedGroup {
                    self.group_widgets(field, &value)
                } else {
                    Vec::new()
                };
                FieldWidget {
                    name: field.name.clone(),
                    label: field.label.clone(),
                    kind: field.kind,
                    required: field.required,
                    error: self.draft.field_errors.get(&field.name).copied(),
                    options: field.options.clone(),
                    pending_file: self
                        .draft
                        .pending_uploads
                        .get(&field.name)
                        .map(|u| u.file_name.clone()),
                    items,
                    value,
                }
            })
            .collect()
    }

    fn group_widgets(&self, field: &FieldDescriptor, value: &Value) -> Vec<Vec<FieldWidget>> {
        let items = value.as_array().map(Vec::as_slice).unwrap_or(&[]);
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                field
                    .sub_fields
                    .iter()
                    .map(|sub| {
                        let key = format!("{}[{}].{}", field.name, index, sub.name);
                        FieldWidget {
                            name: sub.name.clone(),
                            label: sub.label.clone(),
                            kind: sub.kind,
                            required: sub.required,
                            value: item.get(&sub.name).cloned().unwrap_or_default(),
                            error: self.draft.field_errors.get(&key).copied(),
                            options: sub.options.clone(),
                            pending_file: None,
                            items: Vec::new(),
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
