//! Live-state inspection.
//!
//! Reads the backend's current collections verbatim. The snapshot feeds the
//! differ and the resolver, and the generator writes it out as a schema
//! document.

use chrono::{DateTime, Utc};
use markets_schema::{CollectionDef, SchemaDocument};
use tracing::debug;

use crate::backend::SchemaBackend;
use crate::error::MigrateResult;

/// A snapshot of the backend's collections.
#[derive(Debug, Clone)]
pub struct LiveSchema {
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Every live collection, as returned by the backend.
    pub collections: Vec<CollectionDef>,
}

impl LiveSchema {
    /// Wrap a list of collections taken now.
    pub fn new(collections: Vec<CollectionDef>) -> Self {
        Self {
            timestamp: Utc::now(),
            collections,
        }
    }

    /// Get a live collection by name.
    pub fn get(&self, name: &str) -> Option<&CollectionDef> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Number of live collections.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Check if there are no live collections.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Convert the snapshot into a schema document stamped with its timestamp.
    pub fn to_document(&self, version: impl Into<String>) -> SchemaDocument {
        let mut document = SchemaDocument::from_collections(version, self.collections.clone());
        document.generated_at = Some(self.timestamp);
        document
    }
}

/// Reads live state from a backend.
pub struct Inspector<'a, B: SchemaBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: SchemaBackend + ?Sized> Inspector<'a, B> {
    /// Create an inspector over a backend.
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Take a snapshot of every live collection.
    ///
    /// The caller must already hold an admin session.
    pub async fn snapshot(&self) -> MigrateResult<LiveSchema> {
        let collections = self.backend.list_collections().await?;
        debug!(count = collections.len(), "captured live schema");
        Ok(LiveSchema::new(collections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use markets_schema::FieldDef;

    #[tokio::test]
    async fn test_snapshot() {
        let backend = MemoryBackend::new()
            .with_users()
            .with_collection(CollectionDef::base("cats").with_field(FieldDef::text("name")));

        let live = Inspector::new(&backend).snapshot().await.unwrap();

        assert_eq!(live.len(), 2);
        assert!(live.get("cats").unwrap().id.is_some());
        assert!(live.get("dogs").is_none());
    }

    #[tokio::test]
    async fn test_to_document() {
        let backend = MemoryBackend::new().with_collection(CollectionDef::base("cats"));
        let live = Inspector::new(&backend).snapshot().await.unwrap();

        let document = live.to_document("1.0.0");

        assert_eq!(document.generated_at, Some(live.timestamp));
        assert_eq!(document.collection_names(), vec!["cats"]);
    }
}
