//! Collection catalog.
//!
//! The catalog is the JSON file that turns the generic engine into a concrete
//! admin: one entry per content type with its store path, labels and field
//! schema.

use folio_engine::{CollectionConfig, FieldSchema, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub config: CollectionConfig,
    pub schema: FieldSchema,
    /// Blob path prefix for files uploaded to this collection
    #[serde(default)]
    pub upload_prefix: Option<String>,
}

impl CatalogEntry {
    /// Prefix for uploads, defaulting to the collection name.
    pub fn upload_prefix(&self) -> &str {
        self.upload_prefix.as_deref().unwrap_or(&self.config.name)
    }

    fn check(&self) -> Result<(), CatalogError> {
        let name = &self.config.name;
        if !self.config.has_valid_name() {
            return Err(CatalogError::InvalidName(name.clone()));
        }
        self.schema.validate().map_err(|source| CatalogError::Schema {
            collection: name.clone(),
            source,
        })?;

        let referenced = self
            .config
            .type_field
            .iter()
            .chain(self.config.search_fields.iter());
        for field in referenced {
            if self.schema.get(field).is_none() {
                return Err(CatalogError::UnknownField {
                    collection: name.clone(),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Every content type served by this instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub collections: Vec<CatalogEntry>,
}

impl Catalog {
    /// Read and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a catalog document.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(text)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for entry in &self.collections {
            if !seen.insert(entry.config.name.as_str()) {
                return Err(CatalogError::DuplicateCollection(entry.config.name.clone()));
            }
            entry.check()?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.collections.iter().find(|e| e.config.name == name)
    }
}

/// Catalog loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Cannot read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Collection '{collection}' has an invalid schema: {source}")]
    Schema {
        collection: String,
        #[source]
        source: SchemaError,
    },

    #[error("Collection name '{0}' is not a store path")]
    InvalidName(String),

    #[error("Collection '{0}' is declared twice")]
    DuplicateCollection(String),

    #[error("Collection '{collection}' references unknown field '{field}'")]
    UnknownField { collection: String, field: String },
}
