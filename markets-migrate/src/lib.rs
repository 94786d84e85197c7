//! # markets-migrate
//!
//! Schema reconciliation engine for the SA Markets Directory backend.
//!
//! This crate provides functionality for:
//! - Talking to a PocketBase-style backend over its REST API
//! - Snapshotting the live collections
//! - Resolving symbolic relation targets to live collection ids
//! - Diffing a declared schema document against live state
//! - Applying additive changes in dependency order, absorbing per-collection
//!   failures
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ schema.json  │────▶│    Resolver    │────▶│   Differ    │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!                              ▲                     │
//!                              │                     ▼
//!                      ┌────────────────┐     ┌─────────────┐
//!                      │   Inspector    │     │   Applier   │
//!                      └────────────────┘     └─────────────┘
//!                              ▲                     │
//!                              │                     ▼
//!                      ┌──────────────────────────────────┐
//!                      │        Backend (REST API)        │
//!                      └──────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use markets_migrate::{PocketBaseClient, ReconcileEngine};
//! use markets_schema::SchemaLoader;
//!
//! async fn reconcile() -> Result<(), Box<dyn std::error::Error>> {
//!     let declared = SchemaLoader::new("pocketbase/schema.json").load_or_init()?;
//!
//!     let client = PocketBaseClient::new("http://127.0.0.1:8090")?;
//!     client.authenticate_admin("admin@example.com", "secret").await?;
//!
//!     let mut engine = ReconcileEngine::new(&client);
//!     let plan = engine.plan(&declared).await?;
//!     if plan.is_up_to_date() {
//!         return Ok(());
//!     }
//!
//!     let report = engine.apply(&plan).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod alias;
pub mod backend;
pub mod client;
pub mod diff;
pub mod engine;
pub mod error;
pub mod introspect;
pub mod memory;
pub mod resolver;

pub use alias::CollectionAliases;
pub use backend::{AdminAuthenticator, RecordBackend, SchemaBackend};
pub use client::PocketBaseClient;
pub use diff::{Change, DiffResult, SchemaDiffer, diff_collection};
pub use engine::{
    ApplyReport, CreationOrder, FailedOperation, OperationKind, ReconcileEngine, ReconcilePlan,
    adopt_field_ids, creation_order,
};
pub use error::{MigrateResult, MigrationError};
pub use introspect::{Inspector, LiveSchema};
pub use memory::{BackendCall, MemoryBackend};
pub use resolver::{AUTH_SENTINEL, CollectionIdMap, Resolver, placeholder_for};
