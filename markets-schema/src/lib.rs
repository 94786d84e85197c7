//! # markets-schema
//!
//! Declared schema model for the SA Markets Directory backend.
//!
//! This crate provides:
//! - The [`SchemaDocument`] / [`CollectionDef`] / [`FieldDef`] model, in the
//!   JSON shape the backend's collection API speaks
//! - A loader for the declared `schema.json`, bootstrapping an empty document
//!   when none exists
//! - Semantic validation of a declared document
//!
//! ## Example
//!
//! ```rust,ignore
//! use markets_schema::{SchemaLoader, validate_document};
//!
//! let document = SchemaLoader::new("pocketbase/schema.json").load_or_init()?;
//! validate_document(&document)?;
//!
//! for (name, collection) in &document.collections {
//!     println!("{name}: {} fields", collection.schema.len());
//! }
//! ```

pub mod ast;
pub mod error;
pub mod loader;
pub mod validator;

pub use ast::*;
pub use error::{SchemaError, SchemaResult};
pub use loader::{DEFAULT_SCHEMA_VERSION, SchemaLoader};
pub use validator::{Validator, validate_document};
