//! # SA Markets schema management
//!
//! Keeps the SA Markets Directory backend in line with the declared
//! `schema.json`.
//!
//! - [`schema`]: the declared schema model, loader and validator
//! - [`migrate`]: live inspection, id resolution, diffing and additive apply
//!
//! The `schema-manager` binary lives in the `markets-cli` crate.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sa_markets::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MigrationError> {
//!     let declared = SchemaLoader::new("pocketbase/schema.json").load()?;
//!
//!     let client = PocketBaseClient::new("http://127.0.0.1:8090")?;
//!     client.authenticate_admin("admin@example.com", "secret").await?;
//!
//!     let mut engine = ReconcileEngine::new(&client);
//!     let plan = engine.plan(&declared).await?;
//!     if !plan.is_up_to_date() {
//!         let report = engine.apply(&plan).await?;
//!         println!("{}", report.summary());
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Declared schema model, loader and validator.
pub mod schema {
    pub use markets_schema::*;
}

/// Reconciliation against the live backend.
pub mod migrate {
    pub use markets_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        DiffResult, MemoryBackend, MigrationError, PocketBaseClient, ReconcileEngine,
        ReconcilePlan, SchemaBackend,
    };
    pub use crate::schema::{
        CollectionDef, FieldDef, SchemaDocument, SchemaLoader, validate_document,
    };
}
