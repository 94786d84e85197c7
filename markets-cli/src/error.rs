//! CLI error types and result alias.

use markets_migrate::MigrationError;
use markets_schema::SchemaError;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(markets::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(markets::config))]
    Config(String),

    /// Declared schema error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    /// Backend or reconciliation error
    #[error("{0}")]
    #[diagnostic(code(markets::migration))]
    Migration(#[from] MigrationError),

    /// Backend unreachable
    #[error("Cannot connect to the backend at {url}: {message}")]
    #[diagnostic(
        code(markets::connection),
        help("start the backend or point POCKETBASE_URL at a running instance")
    )]
    Connection { url: String, message: String },

    /// Every credential source failed
    #[error("Authentication failed: {0}")]
    #[diagnostic(
        code(markets::auth),
        help("set PB_ADMIN_EMAIL and PB_ADMIN_PASSWORD, or run interactively to be prompted")
    )]
    Auth(String),

    /// The backend has no admin account yet
    #[error("Authentication failed: no admin account exists yet, create one at {url}/_/")]
    #[diagnostic(
        code(markets::auth::no_admin),
        help("create the first admin account in the admin UI, then retry")
    )]
    AdminNotProvisioned { url: String },

    /// Credential cache error
    #[error("Credential cache error: {0}")]
    #[diagnostic(code(markets::credentials))]
    Credentials(String),

    /// Operator cancelled an interactive prompt
    #[error("Cancelled")]
    #[diagnostic(code(markets::cancelled))]
    Cancelled,

    /// Some apply operations failed
    #[error("{failed} of {total} operations failed")]
    #[diagnostic(
        code(markets::apply_failed),
        help("see the run log for request payloads and response bodies")
    )]
    ApplyFailed { failed: usize, total: usize },

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(markets::command))]
    Command(String),
}

impl CliError {
    /// Create a credential cache error.
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Create an authentication error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::Config(format!("Failed to serialize TOML: {}", err))
    }
}
