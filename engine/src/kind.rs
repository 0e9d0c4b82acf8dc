//! Field kind registry.
//!
//! Every kind tag maps to a [`FieldKindHandler`] that knows the kind's
//! default value, what counts as empty, how to normalise submitted values and
//! how to render a value as display text. Overriding a kind's behavior is a
//! [`KindRegistry::register`] call, not an edit to the form or browse code.

use crate::error::FieldError;
use crate::schema::{FieldDescriptor, FieldKind};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Behavior attached to one field kind.
pub trait FieldKindHandler: Send + Sync {
    /// Value a fresh draft starts with.
    fn default_value(&self, field: &FieldDescriptor, registry: &KindRegistry) -> Value;

    /// Whether `value` counts as "no value" for the `required` check.
    fn is_empty(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Canonical form of a submitted value.
    fn normalize(
        &self,
        _field: &FieldDescriptor,
        value: Value,
        _registry: &KindRegistry,
    ) -> Result<Value, FieldError> {
        Ok(value)
    }

    /// Display text for summary and table views.
    fn display(&self, field: &FieldDescriptor, value: &Value) -> String;
}

/// Plain, long and rich text.
#[derive(Debug, Default)]
pub struct TextKind {
    strip_markup: bool,
}

impl TextKind {
    pub fn rich() -> Self {
        Self { strip_markup: true }
    }
}

impl FieldKindHandler for TextKind {
    fn default_value(&self, _field: &FieldDescriptor, _registry: &KindRegistry) -> Value {
        Value::String(String::new())
    }

    fn normalize(
        &self,
        _field: &FieldDescriptor,
        value: Value,
        _registry: &KindRegistry,
    ) -> Result<Value, FieldError> {
        Ok(match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            Value::Null => Value::String(String::new()),
            other => Value::String(other.to_string()),
        })
    }

    fn display(&self, _field: &FieldDescriptor, value: &Value) -> String {
        let text = scalar_text(value);
        if self.strip_markup {
            strip_tags(&text)
        } else {
            text
        }
    }
}

#[derive(Debug, Default)]
pub struct NumericKind;

impl FieldKindHandler for NumericKind {
    fn default_value(&self, _field: &FieldDescriptor, _registry: &KindRegistry) -> Value {
        Value::Null
    }

    fn normalize(
        &self,
        _field: &FieldDescriptor,
        value: Value,
        _registry: &KindRegistry,
    ) -> Result<Value, FieldError> {
        match value {
            Value::Number(_) | Value::Null => Ok(value),
            Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
            Value::String(s) => parse_number(s.trim()).ok_or(FieldError::InvalidNumber),
            _ => Err(FieldError::InvalidNumber),
        }
    }

    fn display(&self, _field: &FieldDescriptor, value: &Value) -> String {
        scalar_text(value)
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    let float = text.parse::<f64>().ok()?;
    serde_json::Number::from_f64(float).map(Value::Number)
}

/// Lists of short tags; a comma-separated string is split on submit.
#[derive(Debug, Default)]
pub struct TagListKind;

impl FieldKindHandler for TagListKind {
    fn default_value(&self, _field: &FieldDescriptor, _registry: &KindRegistry) -> Value {
        Value::Array(Vec::new())
    }

    fn normalize(
        &self,
        _field: &FieldDescriptor,
        value: Value,
        _registry: &KindRegistry,
    ) -> Result<Value, FieldError> {
        let tags: Vec<Value> = match value {
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| Value::String(t.to_string()))
                .collect(),
            Value::Array(items) => items
                .into_iter()
                .map(|item| scalar_text(&item).trim().to_string())
                .filter(|t| !t.is_empty())
                .map(Value::String)
                .collect(),
            Value::Null => Vec::new(),
            other => vec![Value::String(other.to_string())],
        };
        Ok(Value::Array(tags))
    }

    fn display(&self, _field: &FieldDescriptor, value: &Value) -> String {
        match value {
            Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(", "),
            other => scalar_text(other),
        }
    }
}

#[derive(Debug, Default)]
pub struct SelectKind;

impl FieldKindHandler for SelectKind {
    fn default_value(&self, _field: &FieldDescriptor, _registry: &KindRegistry) -> Value {
        Value::String(String::new())
    }

    fn normalize(
        &self,
        field: &FieldDescriptor,
        value: Value,
        _registry: &KindRegistry,
    ) -> Result<Value, FieldError> {
        let chosen = scalar_text(&value).trim().to_string();
        if !chosen.is_empty() && !field.has_option(&chosen) {
            return Err(FieldError::InvalidOption);
        }
        Ok(Value::String(chosen))
    }

    fn display(&self, field: &FieldDescriptor, value: &Value) -> String {
        let chosen = scalar_text(value);
        field
            .options
            .iter()
            .find(|o| o.value == chosen)
            .map(|o| o.label.clone())
            .unwrap_or(chosen)
    }
}

/// File and media uploads. Persisted values are download URLs.
#[derive(Debug, Default)]
pub struct UploadKind;

impl FieldKindHandler for UploadKind {
    fn default_value(&self, _field: &FieldDescriptor, _registry: &KindRegistry) -> Value {
        Value::String(String::new())
    }

    fn display(&self, _field: &FieldDescriptor, value: &Value) -> String {
        scalar_text(value)
    }
}

/// Repeatable groups of sub-fields, stored as a list of objects.
#[derive(Debug, Default)]
pub struct GroupKind;

impl GroupKind {
    /// An empty group item with every sub-field at its default.
    pub fn empty_item(field: &FieldDescriptor, registry: &KindRegistry) -> Value {
        let item: Map<String, Value> = field
            .sub_fields
            .iter()
            .map(|sub| (sub.name.clone(), registry.default_value(sub)))
            .collect();
        Value::Object(item)
    }
}

impl FieldKindHandler for GroupKind {
    fn default_value(&self, field: &FieldDescriptor, registry: &KindRegistry) -> Value {
        Value::Array(vec![Self::empty_item(field, registry)])
    }

    fn is_empty(&self, value: &Value) -> bool {
        match value {
            Value::Array(items) => items.is_empty(),
            _ => true,
        }
    }

    fn normalize(
        &self,
        field: &FieldDescriptor,
        value: Value,
        registry: &KindRegistry,
    ) -> Result<Value, FieldError> {
        let items = match value {
            Value::Array(items) => items,
            _ => Vec::new(),
        };

        let mut normalized = Vec::with_capacity(items.len());
        for item in items {
            let mut source = match item {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            let mut out = Map::new();
            for sub in &field.sub_fields {
                let raw = source
                    .remove(&sub.name)
                    .unwrap_or_else(|| registry.default_value(sub));
                out.insert(sub.name.clone(), registry.normalize(sub, raw)?);
            }
            normalized.push(Value::Object(out));
        }
        Ok(Value::Array(normalized))
    }

    fn display(&self, _field: &FieldDescriptor, value: &Value) -> String {
        let count = value.as_array().map(Vec::len).unwrap_or(0);
        match count {
            1 => "1 item".to_string(),
            n => format!("{} items", n),
        }
    }
}

#[derive(Debug, Default)]
pub struct ColorKind;

impl FieldKindHandler for ColorKind {
    fn default_value(&self, _field: &FieldDescriptor, _registry: &KindRegistry) -> Value {
        Value::String("#000000".to_string())
    }

    fn normalize(
        &self,
        _field: &FieldDescriptor,
        value: Value,
        _registry: &KindRegistry,
    ) -> Result<Value, FieldError> {
        Ok(Value::String(scalar_text(&value).trim().to_lowercase()))
    }

    fn display(&self, _field: &FieldDescriptor, value: &Value) -> String {
        scalar_text(value)
    }
}

/// Mapping from kind tag to handler.
#[derive(Clone)]
pub struct KindRegistry {
    handlers: HashMap<&'static str, Arc<dyn FieldKindHandler>>,
}

impl KindRegistry {
    /// Registry with no handlers. Lookups of unregistered kinds fall back to
    /// plain text behavior.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with a handler for every built-in kind.
    pub fn standard() -> Self {
        Self::empty()
            .with(FieldKind::Text, TextKind::default())
            .with(FieldKind::LongText, TextKind::default())
            .with(FieldKind::RichText, TextKind::rich())
            .with(FieldKind::Numeric, NumericKind)
            .with(FieldKind::TagList, TagListKind)
            .with(FieldKind::SingleSelect, SelectKind)
            .with(FieldKind::FileUpload, UploadKind)
            .with(FieldKind::MediaUpload, UploadKind)
            .with(FieldKind::NestedGroup, GroupKind)
            .with(FieldKind::ColorValue, ColorKind)
    }

    /// Install or replace the handler for a kind.
    pub fn register(&mut self, kind: FieldKind, handler: Arc<dyn FieldKindHandler>) -> &mut Self {
        self.handlers.insert(kind.tag(), handler);
        self
    }

    /// Builder-style registration.
    pub fn with(mut self, kind: FieldKind, handler: impl FieldKindHandler + 'static) -> Self {
        self.register(kind, Arc::new(handler));
        self
    }

    pub fn handler(&self, kind: FieldKind) -> Arc<dyn FieldKindHandler> {
        self.handlers
            .get(kind.tag())
            .cloned()
            .unwrap_or_else(|| Arc::new(TextKind::default()))
    }

    pub fn default_value(&self, field: &FieldDescriptor) -> Value {
        self.handler(field.kind).default_value(field, self)
    }

    pub fn is_empty(&self, field: &FieldDescriptor, value: &Value) -> bool {
        self.handler(field.kind).is_empty(value)
    }

    pub fn normalize(&self, field: &FieldDescriptor, value: Value) -> Result<Value, FieldError> {
        self.handler(field.kind).normalize(field, value, self)
    }

    pub fn display(&self, field: &FieldDescriptor, value: &Value) -> String {
        self.handler(field.kind).display(field, value)
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("KindRegistry").field("kinds", &kinds).finish()
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
