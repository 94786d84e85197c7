//! The top-level schema document.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::collection::CollectionDef;

/// A complete schema document: the declared `schema.json`, or a generated
/// snapshot of the live backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Document version (semver).
    pub version: String,
    /// When the document was generated from a live backend.
    #[serde(
        rename = "generatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub generated_at: Option<DateTime<Utc>>,
    /// Collections keyed by name. Order is kept for output only.
    #[serde(default)]
    pub collections: IndexMap<String, CollectionDef>,
}

impl SchemaDocument {
    /// Create an empty document with the given version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            generated_at: None,
            collections: IndexMap::new(),
        }
    }

    /// Build a document from a list of collections, keyed by their names.
    pub fn from_collections(
        version: impl Into<String>,
        collections: impl IntoIterator<Item = CollectionDef>,
    ) -> Self {
        let mut document = Self::new(version);
        for collection in collections {
            document.add_collection(collection);
        }
        document
    }

    /// Add a collection under its own name, replacing any previous entry.
    pub fn add_collection(&mut self, collection: CollectionDef) {
        self.collections.insert(collection.name.clone(), collection);
    }

    /// Get a collection by key.
    pub fn get(&self, name: &str) -> Option<&CollectionDef> {
        self.collections.get(name)
    }

    /// Check if the document declares no collections.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Names of all collections, in document order.
    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    /// Give every collection with an empty `name` the name of its map key.
    pub fn fill_names_from_keys(&mut self) {
        for (key, collection) in self.collections.iter_mut() {
            if collection.name.is_empty() {
                collection.name = key.clone();
            }
        }
    }

    /// Total number of fields across all collections.
    pub fn field_count(&self) -> usize {
        self.collections.values().map(|c| c.schema.len()).sum()
    }
}

impl Default for SchemaDocument {
    fn default() -> Self {
        Self::new(crate::loader::DEFAULT_SCHEMA_VERSION)
    }
}
