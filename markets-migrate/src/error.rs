//! Error types for the reconciliation engine.

use markets_schema::SchemaError;
use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur while talking to the backend or reconciling schemas.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend could not be reached at all.
    #[error("Cannot connect to backend at {url}: {message}")]
    Connection {
        /// Backend base URL.
        url: String,
        /// Underlying failure.
        message: String,
    },

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
        /// Raw response body.
        body: String,
    },

    /// The requested resource or endpoint does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication was rejected or is missing.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Declared schema error.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// No declared definition matches a collection name.
    #[error("No declared schema for collection '{name}' (available: {})", available.join(", "))]
    SchemaLookup {
        /// Collection name looked up.
        name: String,
        /// Declared collection keys.
        available: Vec<String>,
    },

    /// General migration error.
    #[error("Migration error: {0}")]
    Other(String),
}

impl MigrationError {
    /// Create a connection error.
    pub fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an API error from a status and response body.
    ///
    /// The message is taken from the body's `message` key when present.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = body_message(status, &body);
        Self::Api {
            status,
            message,
            body,
        }
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create an other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Check if this is a not-found class error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Check if this error means the backend is unreachable.
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// The raw response body, if the backend returned one.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

/// The `message` key of a JSON error body, or the body itself.
pub(crate) fn body_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.to_string()
            }
        })
}
