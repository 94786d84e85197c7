//! Error types for loading and validating declared schemas.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while loading or validating a schema document.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading or writing a schema file.
    #[error("failed to access schema file: {path}")]
    #[diagnostic(code(markets::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The schema file is not valid JSON, or does not match the document shape.
    #[error("malformed schema document {path}: {message}")]
    #[diagnostic(
        code(markets::schema::malformed),
        help("fix the JSON by hand or regenerate it with `schema-manager generate`")
    )]
    Malformed {
        path: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        message: String,
    },

    /// A field carries a `type` tag this tool does not know.
    #[error("unknown field type `{type_name}` for field `{field}`")]
    #[diagnostic(code(markets::schema::unknown_field_type))]
    UnknownFieldType { field: String, type_name: String },

    /// A field's `options` record does not match its type.
    #[error("invalid options for {type_name} field `{field}`: {message}")]
    #[diagnostic(code(markets::schema::invalid_options))]
    InvalidOptions {
        field: String,
        type_name: String,
        message: String,
    },

    /// Invalid collection definition.
    #[error("invalid collection `{name}`: {message}")]
    #[diagnostic(code(markets::schema::invalid_collection))]
    InvalidCollection { name: String, message: String },

    /// Invalid field definition.
    #[error("invalid field `{collection}.{field}`: {message}")]
    #[diagnostic(code(markets::schema::invalid_field))]
    InvalidField {
        collection: String,
        field: String,
        message: String,
    },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(markets::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// Validation error with multiple issues.
    #[error("schema validation failed with {count} error(s)")]
    #[diagnostic(code(markets::schema::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<SchemaError>,
    },
}

impl SchemaError {
    /// Create an I/O error for the given path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create a malformed-document error pointing at the serde_json location.
    pub fn malformed(path: impl Into<String>, src: impl Into<String>, err: &serde_json::Error) -> Self {
        let src = src.into();
        let offset = line_col_to_offset(&src, err.line(), err.column());
        Self::Malformed {
            path: path.into(),
            src,
            span: (offset, 1).into(),
            message: err.to_string(),
        }
    }

    /// Create an invalid collection error.
    pub fn invalid_collection(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCollection {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid field error.
    pub fn invalid_field(
        collection: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            collection: collection.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Convert serde_json's 1-based line/column into a byte offset into `src`.
fn line_col_to_offset(src: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = src
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(src.len().saturating_sub(1))
}
