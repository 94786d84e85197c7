//! Backend contracts.
//!
//! The engine only needs a handful of collection operations, so it talks to
//! the backend through [`SchemaBackend`]. [`crate::PocketBaseClient`] speaks
//! the real REST API; [`crate::MemoryBackend`] keeps everything in memory.

use async_trait::async_trait;
use markets_schema::CollectionDef;
use serde_json::Value;

use crate::error::MigrateResult;

/// Collection-level operations against the backend.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// Check the backend is reachable.
    async fn health(&self) -> MigrateResult<()>;

    /// List every collection, following pagination to the end.
    async fn list_collections(&self) -> MigrateResult<Vec<CollectionDef>>;

    /// Create a collection and return it as stored.
    async fn create_collection(&self, collection: &CollectionDef) -> MigrateResult<CollectionDef>;

    /// Replace a collection's definition and return it as stored.
    async fn update_collection(
        &self,
        id_or_name: &str,
        collection: &CollectionDef,
    ) -> MigrateResult<CollectionDef>;
}

/// Record-level operations, used for seeding reference data.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// List every record of a collection.
    async fn list_records(&self, collection: &str) -> MigrateResult<Vec<Value>>;

    /// Create a record and return it as stored.
    async fn create_record(&self, collection: &str, record: &Value) -> MigrateResult<Value>;
}

/// Admin password authentication.
#[async_trait]
pub trait AdminAuthenticator: Send + Sync {
    /// Authenticate as an administrator, returning the session token.
    ///
    /// On success the token is installed for subsequent requests.
    async fn authenticate(&self, email: &str, password: &str) -> MigrateResult<String>;
}
