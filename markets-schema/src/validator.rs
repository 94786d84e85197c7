//! Semantic validation of declared schema documents.
//!
//! This module checks a parsed document for problems the JSON shape alone
//! cannot rule out:
//! - Collection keys match collection names
//! - Field names are present and unique within a collection
//! - Relation fields name a target collection
//! - Select fields offer at least one value
//! - Numeric bounds are ordered

use std::collections::HashSet;

use crate::ast::*;
use crate::error::{SchemaError, SchemaResult};

/// Schema validator collecting every problem before reporting.
#[derive(Debug)]
pub struct Validator {
    errors: Vec<SchemaError>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Validate a document, returning every problem at once.
    pub fn validate(&mut self, document: &SchemaDocument) -> SchemaResult<()> {
        self.errors.clear();

        for (key, collection) in &document.collections {
            self.validate_collection(key, collection);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed {
                count: self.errors.len(),
                errors: std::mem::take(&mut self.errors),
            })
        }
    }

    fn validate_collection(&mut self, key: &str, collection: &CollectionDef) {
        if collection.name.is_empty() {
            self.errors
                .push(SchemaError::invalid_collection(key, "collection name is empty"));
        } else if collection.name != key {
            self.errors.push(SchemaError::invalid_collection(
                key,
                format!("key does not match collection name `{}`", collection.name),
            ));
        }

        let mut seen = HashSet::new();
        for field in &collection.schema {
            if field.name.is_empty() {
                self.errors
                    .push(SchemaError::invalid_field(key, "<unnamed>", "field name is empty"));
                continue;
            }
            if !seen.insert(field.name.as_str()) {
                self.errors
                    .push(SchemaError::duplicate("field", format!("{key}.{}", field.name)));
            }
            self.validate_field(key, field);
        }
    }

    fn validate_field(&mut self, collection: &str, field: &FieldDef) {
        match &field.kind {
            FieldKind::Relation(options) => {
                if options.collection_id.trim().is_empty() {
                    self.errors.push(SchemaError::invalid_field(
                        collection,
                        &field.name,
                        "relation field has no collectionId",
                    ));
                }
                if let (Some(min), Some(max)) = (options.min_select, options.max_select) {
                    if min > max {
                        self.errors.push(SchemaError::invalid_field(
                            collection,
                            &field.name,
                            format!("minSelect {min} exceeds maxSelect {max}"),
                        ));
                    }
                }
            }
            FieldKind::Select(options) => {
                if options.values.is_empty() {
                    self.errors.push(SchemaError::invalid_field(
                        collection,
                        &field.name,
                        "select field has no values",
                    ));
                }
            }
            FieldKind::Text(options) => {
                if let (Some(min), Some(max)) = (options.min, options.max) {
                    if min > max {
                        self.errors.push(SchemaError::invalid_field(
                            collection,
                            &field.name,
                            format!("min length {min} exceeds max length {max}"),
                        ));
                    }
                }
            }
            FieldKind::Number(options) => {
                if let (Some(min), Some(max)) = (options.min, options.max) {
                    if min > max {
                        self.errors.push(SchemaError::invalid_field(
                            collection,
                            &field.name,
                            format!("min {min} exceeds max {max}"),
                        ));
                    }
                }
            }
            _ => {}
        }
    }
}

/// Validate a document with a fresh [`Validator`].
pub fn validate_document(document: &SchemaDocument) -> SchemaResult<()> {
    Validator::new().validate(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(document: &SchemaDocument) -> Vec<SchemaError> {
        match validate_document(document) {
            Err(SchemaError::ValidationFailed { errors, .. }) => errors,
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_valid_document() {
        let document = SchemaDocument::from_collections(
            "1.0.0",
            vec![
                CollectionDef::base("cats").with_field(FieldDef::text("name").required()),
                CollectionDef::base("items")
                    .with_field(FieldDef::text("name"))
                    .with_field(FieldDef::relation("cat", "CATS_ID")),
            ],
        );

        assert!(validate_document(&document).is_ok());
    }

    #[test]
    fn test_validate_empty_document() {
        assert!(validate_document(&SchemaDocument::default()).is_ok());
    }

    #[test]
    fn test_validate_key_mismatch() {
        let mut document = SchemaDocument::default();
        document
            .collections
            .insert("cats".to_string(), CollectionDef::base("kittens"));

        let errors = errors_of(&document);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("kittens"));
    }

    #[test]
    fn test_validate_duplicate_field_names() {
        let document = SchemaDocument::from_collections(
            "1.0.0",
            vec![CollectionDef::base("cats")
                .with_field(FieldDef::text("name"))
                .with_field(FieldDef::text("name"))],
        );

        let errors = errors_of(&document);
        assert!(matches!(errors[0], SchemaError::Duplicate { .. }));
    }

    #[test]
    fn test_validate_relation_without_target() {
        let document = SchemaDocument::from_collections(
            "1.0.0",
            vec![CollectionDef::base("items").with_field(FieldDef::relation("cat", ""))],
        );

        let errors = errors_of(&document);
        assert!(errors[0].to_string().contains("collectionId"));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let document = SchemaDocument::from_collections(
            "1.0.0",
            vec![CollectionDef::base("items")
                .with_field(FieldDef::relation("cat", ""))
                .with_field(FieldDef::new("kind", FieldKind::Select(SelectOptions::default())))
                .with_field(FieldDef::new(
                    "price",
                    FieldKind::Number(NumberOptions {
                        min: Some(10.0),
                        max: Some(1.0),
                        no_decimal: false,
                    }),
                ))
                .with_field(FieldDef::text(""))],
        );

        let err = validate_document(&document).unwrap_err();
        match err {
            SchemaError::ValidationFailed { count, .. } => assert_eq!(count, 4),
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }
}
