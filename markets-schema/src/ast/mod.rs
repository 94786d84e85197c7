//! Schema document types.
//!
//! The types mirror the JSON the backend's collection API reads and writes,
//! so a declared `schema.json`, a live snapshot and a create/update request
//! body all share one shape.

mod collection;
mod field;
mod schema;

pub use collection::{CollectionDef, CollectionType, RuleKind, Rules};
pub use field::{
    DateOptions, DomainOptions, EditorOptions, FieldDef, FieldKind, FileOptions, JsonOptions,
    NumberOptions, RelationOptions, SelectOptions, TextOptions,
};
pub use schema::SchemaDocument;
