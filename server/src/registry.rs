//! Collection registry.
//!
//! Holds one resource manager per catalog entry and hands out shared handles
//! to request handlers.

use std::sync::Arc;

use dashmap::DashMap;
use folio_engine::{DocumentStore, FieldSchema, KindRegistry, ResourceManager};

use crate::catalog::{Catalog, CatalogEntry};

/// A served collection: its catalog entry and live resource manager.
#[derive(Debug)]
pub struct Collection {
    pub entry: CatalogEntry,
    pub schema: Arc<FieldSchema>,
    pub manager: ResourceManager,
}

/// All served collections, keyed by name.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct CollectionRegistry {
    collections: DashMap<String, Arc<Collection>>,
    kinds: Arc<KindRegistry>,
}

impl CollectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with one manager per catalog entry, all on `store`.
    pub fn from_catalog(catalog: &Catalog, store: Arc<dyn DocumentStore>) -> Self {
        let registry = Self::new();
        for entry in &catalog.collections {
            registry.register(entry.clone(), store.clone());
        }
        registry
    }

    /// Create a registry wrapped in Arc for sharing.
    pub fn new_shared(catalog: &Catalog, store: Arc<dyn DocumentStore>) -> Arc<Self> {
        Arc::new(Self::from_catalog(catalog, store))
    }

    /// Register (or replace) a collection.
    pub fn register(&self, entry: CatalogEntry, store: Arc<dyn DocumentStore>) {
        let name = entry.config.name.clone();
        let collection = Collection {
            schema: Arc::new(entry.schema.clone()),
            manager: ResourceManager::for_store(store, entry.config.clone()),
            entry,
        };
        self.collections.insert(name.clone(), Arc::new(collection));
        tracing::info!(collection = %name, "Collection registered");
    }

    /// Look up a collection by name.
    pub fn get(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.get(name).map(|c| c.value().clone())
    }

    /// Kind registry shared by every form built for these collections.
    pub fn kinds(&self) -> Arc<KindRegistry> {
        self.kinds.clone()
    }

    /// All collections, sorted by name.
    pub fn all(&self) -> Vec<Arc<Collection>> {
        let mut all: Vec<_> = self.collections.iter().map(|c| c.value().clone()).collect();
        all.sort_by(|a, b| a.entry.config.name.cmp(&b.entry.config.name));
        all
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
