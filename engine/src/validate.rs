//! Per-field validators.

use crate::error::FieldError;
use crate::kind::KindRegistry;
use crate::schema::FieldDescriptor;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Whether `text` has the usual `local@domain.tld` shape.
pub fn is_email(text: &str) -> bool {
    EMAIL_RE.is_match(text.trim())
}

/// Validate one field value.
///
/// `has_upload` marks a file field whose file is selected but not uploaded
/// yet; such a field is never empty.
///
/// Checks run in order: `required`, then the email shape (only for present
/// values, whether or not the field is required), then the kind's own
/// normalisation (option membership, number parsing).
pub fn validate_field(
    registry: &KindRegistry,
    field: &FieldDescriptor,
    value: Option<&Value>,
    has_upload: bool,
) -> Result<(), FieldError> {
    let value = value.unwrap_or(&Value::Null);
    let empty = registry.is_empty(field, value) && !has_upload;

    if empty {
        return if field.required {
            Err(FieldError::Required)
        } else {
            Ok(())
        };
    }

    if field.email {
        let text = value.as_str().unwrap_or_default();
        if !is_email(text) {
            return Err(FieldError::InvalidEmail);
        }
    }

    if has_upload {
        return Ok(());
    }

    registry.normalize(field, value.clone()).map(|_| ())
}
