//! Field schema definition and validation.
//!
//! A schema is passive data: an ordered list of field descriptors describing
//! one editable record shape. Both the form engine and the browse engine read
//! it; neither mutates it.

use crate::{error::SchemaError, FieldName};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keys that live on every record and can never be schema fields.
pub const RESERVED_KEYS: [&str; 3] = ["id", "likes", "comments"];

/// Field kinds supported in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    RichText,
    LongText,
    Numeric,
    TagList,
    SingleSelect,
    FileUpload,
    /// File or video upload, see [`MediaType`]
    MediaUpload,
    NestedGroup,
    ColorValue,
}

impl FieldKind {
    /// Stable tag used as the kind registry key.
    pub fn tag(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::RichText => "richText",
            FieldKind::LongText => "longText",
            FieldKind::Numeric => "numeric",
            FieldKind::TagList => "tagList",
            FieldKind::SingleSelect => "singleSelect",
            FieldKind::FileUpload => "fileUpload",
            FieldKind::MediaUpload => "mediaUpload",
            FieldKind::NestedGroup => "nestedGroup",
            FieldKind::ColorValue => "colorValue",
        }
    }

    /// Whether values of this kind are selected files resolved at submit time.
    pub fn is_upload(&self) -> bool {
        matches!(self, FieldKind::FileUpload | FieldKind::MediaUpload)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Media accepted by a `mediaUpload` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    File,
    Video,
}

/// One choice of a `singleSelect` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Definition of one editable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Field name, also the record key
    pub name: FieldName,
    /// Human label
    pub label: String,
    /// Field kind
    pub kind: FieldKind,
    /// Choices for `singleSelect`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    /// Members of a `nestedGroup`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_fields: Vec<FieldDescriptor>,
    /// Accepted media for `mediaUpload`
    #[serde(default)]
    pub media: MediaType,
    /// Whether a value must be present
    #[serde(default)]
    pub required: bool,
    /// Whether a present value must look like an email address
    #[serde(default)]
    pub email: bool,
}

impl FieldDescriptor {
    /// Create an optional field of the given kind.
    pub fn new(name: impl Into<FieldName>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            options: Vec::new(),
            sub_fields: Vec::new(),
            media: MediaType::default(),
            required: false,
            email: false,
        }
    }

    pub fn text(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn select(
        name: impl Into<FieldName>,
        label: impl Into<String>,
        options: Vec<SelectOption>,
    ) -> Self {
        Self::new(name, label, FieldKind::SingleSelect).with_options(options)
    }

    pub fn group(
        name: impl Into<FieldName>,
        label: impl Into<String>,
        sub_fields: Vec<FieldDescriptor>,
    ) -> Self {
        let mut field = Self::new(name, label, FieldKind::NestedGroup);
        field.sub_fields = sub_fields;
        field
    }

    /// Builder-style: mark the field required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Builder-style: require an email-shaped value when present.
    pub fn email(mut self) -> Self {
        self.email = true;
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_media(mut self, media: MediaType) -> Self {
        self.media = media;
        self
    }

    /// Look up a group member by name.
    pub fn sub_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.sub_fields.iter().find(|f| f.name == name)
    }

    /// Whether `value` is one of this field's option values.
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    fn check(&self, depth: usize) -> Result<(), SchemaError> {
        if !is_path_segment(&self.name) {
            return Err(SchemaError::InvalidFieldName(self.name.clone()));
        }
        if RESERVED_KEYS.contains(&self.name.as_str()) {
            return Err(SchemaError::ReservedFieldName(self.name.clone()));
        }

        match self.kind {
            FieldKind::SingleSelect if self.options.is_empty() => {
                Err(SchemaError::MissingOptions(self.name.clone()))
            }
            FieldKind::NestedGroup if depth > 0 => {
                Err(SchemaError::NestedGroupTooDeep(self.name.clone()))
            }
            FieldKind::NestedGroup => {
                if self.sub_fields.is_empty() {
                    return Err(SchemaError::EmptyGroup(self.name.clone()));
                }
                let mut seen = HashSet::new();
                for sub in &self.sub_fields {
                    if sub.kind == FieldKind::NestedGroup {
                        return Err(SchemaError::NestedGroupTooDeep(self.name.clone()));
                    }
                    sub.check(depth + 1)?;
                    if !seen.insert(sub.name.as_str()) {
                        return Err(SchemaError::DuplicateField(format!(
                            "{}.{}",
                            self.name, sub.name
                        )));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Whether `name` can be used as one segment of a store path.
pub fn is_path_segment(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_control())
}

/// Ordered field descriptors for one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldDescriptor>,
}

impl FieldSchema {
    /// Create a schema, checking its invariants.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, SchemaError> {
        let schema = Self { fields };
        schema.validate()?;
        Ok(schema)
    }

    /// Check name validity, uniqueness and the one-level nesting rule.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            field.check(0)?;
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(())
    }

    /// Mark the named fields required, on top of any descriptor flags.
    ///
    /// Unknown names are ignored.
    pub fn with_required(mut self, names: &[&str]) -> Self {
        for field in &mut self.fields {
            if names.contains(&field.name.as_str()) {
                field.required = true;
            }
        }
        self
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of the fields that must carry a value.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story_schema() -> FieldSchema {
        FieldSchema::new(vec![
            FieldDescriptor::text("title", "Title").required(),
            FieldDescriptor::select(
                "type",
                "Type",
                vec![
                    SelectOption::new("Story", "story"),
                    SelectOption::new("Novel", "novel"),
                ],
            )
            .required(),
            FieldDescriptor::new("body", "Body", FieldKind::RichText),
        ])
        .unwrap()
    }

    #[test]
    fn valid_schema() {
        let schema = story_schema();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.get("type").unwrap().options.len(), 2);
        assert_eq!(
            schema.required_fields().collect::<Vec<_>>(),
            vec!["title", "type"]
        );
    }

    #[test]
    fn rejects_duplicate_names() {
        let result = FieldSchema::new(vec![
            FieldDescriptor::text("title", "Title"),
            FieldDescriptor::text("title", "Again"),
        ]);
        assert_eq!(result, Err(SchemaError::DuplicateField("title".into())));
    }

    #[test]
    fn rejects_bad_path_segments() {
        for name in ["", "a.b", "a/b", "price$", "x[0]", "tab\tname"] {
            let result = FieldSchema::new(vec![FieldDescriptor::text(name, "Bad")]);
            assert!(
                matches!(result, Err(SchemaError::InvalidFieldName(_))),
                "accepted {:?}",
                name
            );
        }
    }

    #[test]
    fn rejects_reserved_names() {
        let result = FieldSchema::new(vec![FieldDescriptor::text("likes", "Likes")]);
        assert_eq!(result, Err(SchemaError::ReservedFieldName("likes".into())));
    }

    #[test]
    fn rejects_nested_groups_two_deep() {
        let inner = FieldDescriptor::group(
            "parts",
            "Parts",
            vec![FieldDescriptor::text("name", "Name")],
        );
        let outer = FieldDescriptor::group("chapters", "Chapters", vec![inner]);

        let result = FieldSchema::new(vec![outer]);
        assert_eq!(
            result,
            Err(SchemaError::NestedGroupTooDeep("chapters".into()))
        );
    }

    #[test]
    fn rejects_select_without_options() {
        let result = FieldSchema::new(vec![FieldDescriptor::new(
            "type",
            "Type",
            FieldKind::SingleSelect,
        )]);
        assert_eq!(result, Err(SchemaError::MissingOptions("type".into())));
    }

    #[test]
    fn with_required_marks_fields() {
        let schema = FieldSchema::new(vec![
            FieldDescriptor::text("title", "Title"),
            FieldDescriptor::text("author", "Author"),
        ])
        .unwrap()
        .with_required(&["author", "missing"]);

        assert!(!schema.get("title").unwrap().required);
        assert!(schema.get("author").unwrap().required);
    }

    #[test]
    fn schema_deserializes_from_camel_case() {
        let json = r#"[
            {"name": "title", "label": "Title", "kind": "text", "required": true},
            {"name": "clip", "label": "Clip", "kind": "mediaUpload", "media": "video"},
            {"name": "lessons", "label": "Lessons", "kind": "nestedGroup",
             "subFields": [{"name": "heading", "label": "Heading", "kind": "text"}]}
        ]"#;

        let schema: FieldSchema = serde_json::from_str(json).unwrap();
        schema.validate().unwrap();

        assert!(schema.get("title").unwrap().required);
        assert_eq!(schema.get("clip").unwrap().media, MediaType::Video);
        assert_eq!(schema.get("lessons").unwrap().sub_fields.len(), 1);
    }

    #[test]
    fn kind_tags() {
        assert_eq!(FieldKind::RichText.tag(), "richText");
        assert_eq!(FieldKind::MediaUpload.to_string(), "mediaUpload");
        assert!(FieldKind::FileUpload.is_upload());
        assert!(!FieldKind::ColorValue.is_upload());
    }
}
