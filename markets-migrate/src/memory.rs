//! In-memory backend.
//!
//! Holds collections and records in process memory and enforces the rules of
//! the real backend that reconciliation depends on:
//! - Collection names are unique
//! - Relation fields must point at the id of an existing collection
//! - Server-side ids are assigned to new collections and fields
//!
//! Failures can be injected per collection name to exercise error paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use markets_migrate::MemoryBackend;
//!
//! let backend = MemoryBackend::new()
//!     .with_users()
//!     .with_admin("admin@example.com", "secret")
//!     .fail_create("items");
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use markets_schema::{CollectionDef, CollectionType, FieldDef, Rules};
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::backend::{AdminAuthenticator, RecordBackend, SchemaBackend};
use crate::error::{MigrateResult, MigrationError};

/// Id of the auth collection a fresh backend ships with.
pub const USERS_COLLECTION_ID: &str = "_pb_users_auth_";

/// A write performed against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// Collection created.
    Create(String),
    /// Collection updated.
    Update(String),
    /// Record created in the named collection.
    CreateRecord(String),
}

#[derive(Debug, Default)]
struct State {
    collections: Vec<CollectionDef>,
    records: HashMap<String, Vec<Value>>,
    next_id: u64,
    admin: Option<(String, String)>,
    offline: bool,
    fail_create: HashSet<String>,
    fail_update: HashSet<String>,
    fail_record: HashSet<String>,
    calls: Vec<BackendCall>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:06}", self.next_id)
    }

    fn position(&self, id_or_name: &str) -> Option<usize> {
        self.collections
            .iter()
            .position(|c| c.id.as_deref() == Some(id_or_name) || c.name == id_or_name)
    }

    fn check_relations(&self, collection: &CollectionDef) -> MigrateResult<()> {
        for field in &collection.schema {
            if let Some(target) = field.relation_target() {
                let exists = self
                    .collections
                    .iter()
                    .any(|c| c.id.as_deref() == Some(target));
                let self_reference = collection.id.as_deref() == Some(target);
                if !exists && !self_reference {
                    return Err(validation_error(
                        &field.name,
                        "validation_missing_rel_collection",
                        &format!("Missing or invalid collection id {target}."),
                    ));
                }
            }
        }
        Ok(())
    }

    fn assign_field_ids(&mut self, fields: &mut [FieldDef]) {
        for field in fields.iter_mut() {
            if field.id.is_none() {
                field.id = Some(self.next_id("fld_"));
            }
        }
    }

    fn ensure_online(&self) -> MigrateResult<()> {
        if self.offline {
            Err(MigrationError::connection("memory://", "backend offline"))
        } else {
            Ok(())
        }
    }
}

fn validation_error(field: &str, code: &str, message: &str) -> MigrationError {
    let body = json!({
        "code": 400,
        "message": "Failed to validate the collection.",
        "data": { "schema": { field: { "code": code, "message": message } } }
    });
    MigrationError::api(400, body.to_string())
}

/// Backend keeping all state in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the default `users` auth collection.
    pub fn with_users(self) -> Self {
        let users = CollectionDef::new("users", CollectionType::Auth)
            .with_id(USERS_COLLECTION_ID)
            .with_field(FieldDef::text("name").with_id("users_name"));
        self.with_collection(users)
    }

    /// Add a live collection as-is. A missing id is assigned.
    pub fn with_collection(self, mut collection: CollectionDef) -> Self {
        {
            let mut state = self.state.lock();
            if collection.id.is_none() {
                collection.id = Some(state.next_id("pbc_"));
            }
            state.assign_field_ids(&mut collection.schema);
            state.collections.push(collection);
        }
        self
    }

    /// Provision an admin account.
    pub fn with_admin(self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.state.lock().admin = Some((email.into(), password.into()));
        self
    }

    /// Add an existing record.
    pub fn with_record(self, collection: &str, record: Value) -> Self {
        self.state
            .lock()
            .records
            .entry(collection.to_string())
            .or_default()
            .push(record);
        self
    }

    /// Make every request fail as unreachable.
    pub fn offline(self) -> Self {
        self.state.lock().offline = true;
        self
    }

    /// Reject creation of the named collection.
    pub fn fail_create(self, name: impl Into<String>) -> Self {
        self.state.lock().fail_create.insert(name.into());
        self
    }

    /// Reject updates of the named collection.
    pub fn fail_update(self, name: impl Into<String>) -> Self {
        self.state.lock().fail_update.insert(name.into());
        self
    }

    /// Reject record creation in the named collection.
    pub fn fail_record(self, collection: impl Into<String>) -> Self {
        self.state.lock().fail_record.insert(collection.into());
        self
    }

    /// Snapshot of a live collection by id or name.
    pub fn collection(&self, id_or_name: &str) -> Option<CollectionDef> {
        let state = self.state.lock();
        state
            .position(id_or_name)
            .map(|i| state.collections[i].clone())
    }

    /// Records stored in a collection.
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.state
            .lock()
            .records
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Writes performed so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    /// Forget recorded writes.
    pub fn reset_calls(&self) {
        self.state.lock().calls.clear();
    }
}

#[async_trait]
impl SchemaBackend for MemoryBackend {
    async fn health(&self) -> MigrateResult<()> {
        self.state.lock().ensure_online()
    }

    async fn list_collections(&self) -> MigrateResult<Vec<CollectionDef>> {
        let state = self.state.lock();
        state.ensure_online()?;
        Ok(state.collections.clone())
    }

    async fn create_collection(&self, collection: &CollectionDef) -> MigrateResult<CollectionDef> {
        let mut state = self.state.lock();
        state.ensure_online()?;

        if state.fail_create.contains(&collection.name) {
            return Err(MigrationError::api(
                400,
                json!({ "code": 400, "message": "Failed to create collection." }).to_string(),
            ));
        }
        if state.position(&collection.name).is_some() {
            return Err(MigrationError::api(
                400,
                json!({
                    "code": 400,
                    "message": "Failed to validate the collection.",
                    "data": { "name": { "code": "validation_collection_name_exists" } }
                })
                .to_string(),
            ));
        }
        state.check_relations(collection)?;

        let mut stored = collection.clone();
        stored.id = Some(state.next_id("pbc_"));
        state.assign_field_ids(&mut stored.schema);
        stored.indexes.get_or_insert_with(Vec::new);
        stored.options.get_or_insert_with(Default::default);

        state.calls.push(BackendCall::Create(stored.name.clone()));
        state.collections.push(stored.clone());
        Ok(stored)
    }

    async fn update_collection(
        &self,
        id_or_name: &str,
        collection: &CollectionDef,
    ) -> MigrateResult<CollectionDef> {
        let mut state = self.state.lock();
        state.ensure_online()?;

        let Some(index) = state.position(id_or_name) else {
            return Err(MigrationError::api(
                404,
                json!({ "code": 404, "message": "The requested resource wasn't found." })
                    .to_string(),
            ));
        };
        let name = state.collections[index].name.clone();
        if state.fail_update.contains(&name) {
            return Err(MigrationError::api(
                400,
                json!({ "code": 400, "message": "Failed to update collection." }).to_string(),
            ));
        }

        let mut incoming = collection.clone();
        incoming.id = state.collections[index].id.clone();
        state.check_relations(&incoming)?;

        let mut schema = incoming.schema;
        state.assign_field_ids(&mut schema);

        let rules: Rules = incoming.rules;
        let stored = &mut state.collections[index];
        stored.schema = schema;
        stored.rules = rules;
        if incoming.indexes.is_some() {
            stored.indexes = incoming.indexes;
        }
        if incoming.options.is_some() {
            stored.options = incoming.options;
        }
        let stored = stored.clone();

        state.calls.push(BackendCall::Update(name));
        Ok(stored)
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn list_records(&self, collection: &str) -> MigrateResult<Vec<Value>> {
        let state = self.state.lock();
        state.ensure_online()?;
        if state.position(collection).is_none() {
            return Err(MigrationError::api(
                404,
                json!({ "code": 404, "message": "Missing collection context." }).to_string(),
            ));
        }
        Ok(state.records.get(collection).cloned().unwrap_or_default())
    }

    async fn create_record(&self, collection: &str, record: &Value) -> MigrateResult<Value> {
        let mut state = self.state.lock();
        state.ensure_online()?;
        if state.position(collection).is_none() {
            return Err(MigrationError::api(
                404,
                json!({ "code": 404, "message": "Missing collection context." }).to_string(),
            ));
        }
        if state.fail_record.contains(collection) {
            return Err(MigrationError::api(
                400,
                json!({ "code": 400, "message": "Failed to create record." }).to_string(),
            ));
        }

        let mut stored = record.clone();
        let id = state.next_id("rec_");
        if let Some(object) = stored.as_object_mut() {
            object.insert("id".to_string(), Value::String(id));
        }
        state
            .records
            .entry(collection.to_string())
            .or_default()
            .push(stored.clone());
        state.calls.push(BackendCall::CreateRecord(collection.to_string()));
        Ok(stored)
    }
}

#[async_trait]
impl AdminAuthenticator for MemoryBackend {
    async fn authenticate(&self, email: &str, password: &str) -> MigrateResult<String> {
        let state = self.state.lock();
        state.ensure_online()?;
        match &state.admin {
            None => Err(MigrationError::api(
                404,
                json!({ "code": 404, "message": "The requested resource wasn't found." })
                    .to_string(),
            )),
            Some((e, p)) if e == email && p == password => Ok(format!("token-for-{email}")),
            Some(_) => Err(MigrationError::api(
                400,
                json!({ "code": 400, "message": "Failed to authenticate." }).to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let backend = MemoryBackend::new();
        let created = backend
            .create_collection(&CollectionDef::base("cats").with_field(FieldDef::text("name")))
            .await
            .unwrap();

        assert!(created.id.is_some());
        assert!(created.schema[0].id.is_some());
        assert_eq!(backend.calls(), vec![BackendCall::Create("cats".into())]);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_relation_target() {
        let backend = MemoryBackend::new();
        let err = backend
            .create_collection(
                &CollectionDef::base("items").with_field(FieldDef::relation("cat", "cats")),
            )
            .await
            .unwrap_err();

        assert!(err.response_body().unwrap().contains("validation_missing_rel_collection"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let backend = MemoryBackend::new().with_collection(CollectionDef::base("cats"));
        let err = backend
            .create_collection(&CollectionDef::base("cats"))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_update_keeps_field_ids() {
        let backend = MemoryBackend::new()
            .with_collection(CollectionDef::base("cats").with_field(FieldDef::text("name")));
        let live = backend.collection("cats").unwrap();
        let field_id = live.schema[0].id.clone();

        let mut update = live.clone();
        update.schema.push(FieldDef::text("colour"));
        let stored = backend.update_collection("cats", &update).await.unwrap();

        assert_eq!(stored.schema[0].id, field_id);
        assert!(stored.schema[1].id.is_some());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let backend = MemoryBackend::new().with_admin("admin@example.com", "secret");
        assert!(backend.authenticate("admin@example.com", "secret").await.is_ok());
        assert!(backend.authenticate("admin@example.com", "wrong").await.is_err());

        let unprovisioned = MemoryBackend::new();
        let err = unprovisioned.authenticate("a@b.c", "x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_offline() {
        let backend = MemoryBackend::new().offline();
        assert!(backend.health().await.unwrap_err().is_connection());
    }
}
