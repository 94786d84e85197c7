//! CLI command implementations.

pub mod apply;
pub mod compare;
pub mod generate;
pub mod logout;
pub mod seed;
pub mod setup;
pub mod validate;

use markets_migrate::{DiffResult, PocketBaseClient, SchemaBackend};
use markets_schema::{SchemaDocument, SchemaLoader, validate_document};
use std::path::PathBuf;
use tracing::info;

use crate::auth::{
    AdminCredentials, FileCredentialStore, Session, SessionManager, TerminalPrompter,
};
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output;

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    /// Backend base URL after CLI and env overrides
    pub url: String,
}

impl Context {
    /// Build a context; `url` overrides the configured backend URL.
    pub fn new(config: Config, url: Option<String>) -> Self {
        let url = url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| config.server.url.clone());
        Self { config, url }
    }

    /// Loader for the declared schema, honoring a per-command override.
    pub fn schema_loader(&self, path: Option<PathBuf>) -> SchemaLoader {
        SchemaLoader::new(path.unwrap_or_else(|| self.config.schema.path.clone()))
    }

    /// The on-disk credential cache.
    pub fn credential_store(&self) -> FileCredentialStore {
        FileCredentialStore::new(self.config.credentials.resolved_path())
    }

    /// Load (creating if missing) and validate the declared schema.
    pub fn load_declared(&self, path: Option<PathBuf>) -> CliResult<SchemaDocument> {
        let loader = self.schema_loader(path);
        let document = loader.load_or_init()?;
        validate_document(&document)?;
        info!(
            path = %loader.path().display(),
            collections = document.collections.len(),
            "loaded declared schema"
        );
        Ok(document)
    }

    /// Check the backend is reachable and establish an admin session.
    pub async fn connect(&self) -> CliResult<(PocketBaseClient, Session)> {
        let client = PocketBaseClient::new(&self.url)?;

        client
            .health()
            .await
            .map_err(|e| CliError::Connection {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        info!(url = %self.url, "backend reachable");

        let ttl = self.config.credentials.ttl()?;
        let session = SessionManager::new(
            &client,
            Box::new(self.credential_store()),
            Box::new(TerminalPrompter::new()),
            &self.url,
        )
        .with_env_credentials(AdminCredentials::from_env())
        .with_ttl(ttl)
        .login()
        .await?;

        Ok((client, session))
    }
}

/// Print the authenticated admin.
pub fn print_session(session: &Session) {
    output::success(&format!(
        "Authenticated as {} (via {})",
        session.email, session.source
    ));
}

/// Print a diff grouped by operation.
pub fn print_diff(diff: &DiffResult) {
    if diff.is_empty() {
        output::success("Schema is up to date");
        return;
    }

    if !diff.to_create.is_empty() {
        output::section("Collections to create:");
        for name in &diff.to_create {
            output::list_item(name);
        }
        output::newline();
    }

    if !diff.to_update.is_empty() {
        output::section("Collections to update:");
        for (name, changes) in &diff.to_update {
            output::list_item(&format!("{} ({} changes)", name, changes.len()));
            for change in changes {
                output::change(&change.to_string());
            }
        }
        output::newline();
    }

    if !diff.to_delete.is_empty() {
        output::section("Live collections not in the declared schema (left untouched):");
        for name in &diff.to_delete {
            output::list_item(name);
        }
        output::newline();
    }

    output::info(&diff.summary());
}
