//! Admin session establishment.
//!
//! Credentials are tried in order: environment variables, the encrypted
//! cache, then an interactive prompt. The first source that authenticates
//! wins and is written back to the cache with a fresh expiry.

use chrono::Duration;
use markets_migrate::{AdminAuthenticator, MigrationError};
use std::fmt;
use tracing::{debug, info, warn};

use super::credentials::{CredentialStore, StoredCredentials};
use super::prompt::Prompter;
use crate::error::{CliError, CliResult};

/// Env var holding the admin email
pub const ADMIN_EMAIL_ENV: &str = "PB_ADMIN_EMAIL";

/// Env var holding the admin password
pub const ADMIN_PASSWORD_ENV: &str = "PB_ADMIN_PASSWORD";

/// Where a session's credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Cache,
    Prompt,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::Cache => write!(f, "credential cache"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// An authenticated admin session.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    pub token: String,
    pub source: CredentialSource,
}

/// Email and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Read `PB_ADMIN_EMAIL` and `PB_ADMIN_PASSWORD`; both must be non-empty.
    pub fn from_env() -> Option<Self> {
        let email = std::env::var(ADMIN_EMAIL_ENV).ok()?;
        let password = std::env::var(ADMIN_PASSWORD_ENV).ok()?;
        if email.trim().is_empty() || password.is_empty() {
            return None;
        }
        Some(Self::new(email.trim(), password))
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Walks the credential sources until one authenticates.
pub struct SessionManager<'a, A: AdminAuthenticator + ?Sized> {
    authenticator: &'a A,
    store: Box<dyn CredentialStore>,
    prompter: Box<dyn Prompter>,
    env_credentials: Option<AdminCredentials>,
    ttl: Duration,
    url: String,
}

impl<'a, A: AdminAuthenticator + ?Sized> SessionManager<'a, A> {
    pub fn new(
        authenticator: &'a A,
        store: Box<dyn CredentialStore>,
        prompter: Box<dyn Prompter>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            authenticator,
            store,
            prompter,
            env_credentials: None,
            ttl: Duration::days(crate::config::CREDENTIAL_TTL_DAYS),
            url: url.into(),
        }
    }

    /// Credentials to try first, usually [`AdminCredentials::from_env`].
    pub fn with_env_credentials(mut self, credentials: Option<AdminCredentials>) -> Self {
        self.env_credentials = credentials;
        self
    }

    /// Lifetime of re-persisted credentials.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Establish a session.
    pub async fn login(&self) -> CliResult<Session> {
        let mut errors: Vec<MigrationError> = Vec::new();

        if let Some(creds) = &self.env_credentials {
            debug!(email = %creds.email, "trying credentials from environment");
            match self.try_credentials(creds, CredentialSource::Environment).await {
                Ok(session) => return Ok(session),
                Err(e) => {
                    warn!("environment credentials rejected: {e}");
                    errors.push(e);
                }
            }
        }

        match self.store.load() {
            Ok(Some(cached)) if cached.is_expired() => {
                info!("cached credentials expired");
                self.clear_cache();
            }
            Ok(Some(cached)) => {
                debug!(email = %cached.email, "trying cached credentials");
                let creds = AdminCredentials::new(cached.email, cached.password);
                match self.try_credentials(&creds, CredentialSource::Cache).await {
                    Ok(session) => return Ok(session),
                    Err(e) => {
                        warn!("cached credentials rejected: {e}");
                        self.clear_cache();
                        errors.push(e);
                    }
                }
            }
            Ok(None) => debug!("no cached credentials"),
            Err(e) => {
                warn!("credential cache unreadable: {e}");
                self.clear_cache();
            }
        }

        let email = self.prompter.email()?;
        let password = self.prompter.password()?;
        let creds = AdminCredentials::new(email, password);
        match self.try_credentials(&creds, CredentialSource::Prompt).await {
            Ok(session) => Ok(session),
            Err(e) => {
                errors.push(e);
                self.clear_cache();
                Err(self.failure(&errors))
            }
        }
    }

    async fn try_credentials(
        &self,
        creds: &AdminCredentials,
        source: CredentialSource,
    ) -> Result<Session, MigrationError> {
        let token = self
            .authenticator
            .authenticate(&creds.email, &creds.password)
            .await?;

        info!(email = %creds.email, source = %source, "authenticated as admin");
        let stored = StoredCredentials::new(&creds.email, &creds.password, &token, self.ttl);
        if let Err(e) = self.store.save(&stored) {
            warn!("could not cache credentials: {e}");
        }

        Ok(Session {
            email: creds.email.clone(),
            token,
            source,
        })
    }

    fn clear_cache(&self) {
        if let Err(e) = self.store.clear() {
            warn!("could not clear credential cache: {e}");
        }
    }

    fn failure(&self, errors: &[MigrationError]) -> CliError {
        if errors.iter().any(MigrationError::is_not_found) {
            return CliError::AdminNotProvisioned {
                url: self.url.clone(),
            };
        }
        match errors.last() {
            Some(e) => CliError::auth(e.to_string()),
            None => CliError::auth("no credentials available"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::MemoryCredentialStore;
    use markets_migrate::MemoryBackend;
    use parking_lot::Mutex;
    use std::sync::Arc;

    const URL: &str = "http://127.0.0.1:8090";

    /// Scripted prompter that records how often it was asked.
    #[derive(Default)]
    struct ScriptedPrompter {
        answer: Option<(String, String)>,
        asked: Arc<Mutex<usize>>,
    }

    impl ScriptedPrompter {
        fn answering(email: &str, password: &str) -> Self {
            Self {
                answer: Some((email.into(), password.into())),
                asked: Arc::default(),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn email(&self) -> CliResult<String> {
            *self.asked.lock() += 1;
            match &self.answer {
                Some((email, _)) => Ok(email.clone()),
                None => Err(CliError::Cancelled),
            }
        }

        fn password(&self) -> CliResult<String> {
            match &self.answer {
                Some((_, password)) => Ok(password.clone()),
                None => Err(CliError::Cancelled),
            }
        }
    }

    /// Shares one memory store between the manager and the test.
    struct SharedStore(Arc<MemoryCredentialStore>);

    impl CredentialStore for SharedStore {
        fn load(&self) -> CliResult<Option<StoredCredentials>> {
            self.0.load()
        }
        fn save(&self, credentials: &StoredCredentials) -> CliResult<()> {
            self.0.save(credentials)
        }
        fn clear(&self) -> CliResult<()> {
            self.0.clear()
        }
    }

    fn cached(email: &str, password: &str, ttl: Duration) -> StoredCredentials {
        StoredCredentials::new(email, password, "old-token", ttl)
    }

    fn manager<'a>(
        backend: &'a MemoryBackend,
        store: &Arc<MemoryCredentialStore>,
        prompter: ScriptedPrompter,
    ) -> SessionManager<'a, MemoryBackend> {
        SessionManager::new(
            backend,
            Box::new(SharedStore(Arc::clone(store))),
            Box::new(prompter),
            URL,
        )
    }

    #[tokio::test]
    async fn test_env_credentials_win() {
        let backend = MemoryBackend::new().with_admin("admin@example.com", "secret");
        let store = Arc::new(MemoryCredentialStore::new());
        let prompter = ScriptedPrompter::default();
        let asked = Arc::clone(&prompter.asked);

        let session = manager(&backend, &store, prompter)
            .with_env_credentials(Some(AdminCredentials::new("admin@example.com", "secret")))
            .login()
            .await
            .unwrap();

        assert_eq!(session.source, CredentialSource::Environment);
        assert_eq!(session.token, "token-for-admin@example.com");
        assert_eq!(*asked.lock(), 0);
        assert_eq!(store.current().unwrap().password, "secret");
    }

    #[tokio::test]
    async fn test_bad_env_falls_back_to_cache() {
        let backend = MemoryBackend::new().with_admin("admin@example.com", "secret");
        let store = Arc::new(MemoryCredentialStore::with_credentials(cached(
            "admin@example.com",
            "secret",
            Duration::days(7),
        )));

        let session = manager(&backend, &store, ScriptedPrompter::default())
            .with_env_credentials(Some(AdminCredentials::new("admin@example.com", "wrong")))
            .login()
            .await
            .unwrap();

        assert_eq!(session.source, CredentialSource::Cache);
        assert_eq!(store.clear_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_refreshes_expiry() {
        let backend = MemoryBackend::new().with_admin("admin@example.com", "secret");
        let before = cached("admin@example.com", "secret", Duration::hours(1));
        let store = Arc::new(MemoryCredentialStore::with_credentials(before.clone()));

        manager(&backend, &store, ScriptedPrompter::default())
            .login()
            .await
            .unwrap();

        let after = store.current().unwrap();
        assert!(after.expires_at > before.expires_at);
        assert_eq!(after.token, "token-for-admin@example.com");
    }

    #[tokio::test]
    async fn test_expired_cache_is_cleared_and_prompted() {
        let backend = MemoryBackend::new().with_admin("admin@example.com", "secret");
        let store = Arc::new(MemoryCredentialStore::with_credentials(cached(
            "admin@example.com",
            "secret",
            Duration::seconds(-5),
        )));
        let prompter = ScriptedPrompter::answering("admin@example.com", "secret");
        let asked = Arc::clone(&prompter.asked);

        let session = manager(&backend, &store, prompter).login().await.unwrap();

        assert_eq!(session.source, CredentialSource::Prompt);
        assert_eq!(*asked.lock(), 1);
        assert_eq!(store.clear_count(), 1);
        assert!(!store.current().unwrap().is_expired());
    }

    #[tokio::test]
    async fn test_stale_cached_password_is_cleared() {
        let backend = MemoryBackend::new().with_admin("admin@example.com", "rotated");
        let store = Arc::new(MemoryCredentialStore::with_credentials(cached(
            "admin@example.com",
            "secret",
            Duration::days(7),
        )));

        let session = manager(
            &backend,
            &store,
            ScriptedPrompter::answering("admin@example.com", "rotated"),
        )
        .login()
        .await
        .unwrap();

        assert_eq!(session.source, CredentialSource::Prompt);
        assert_eq!(store.clear_count(), 1);
        assert_eq!(store.current().unwrap().password, "rotated");
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_cleared() {
        let backend = MemoryBackend::new().with_admin("admin@example.com", "secret");
        let store = Arc::new(MemoryCredentialStore::corrupt());

        let session = manager(
            &backend,
            &store,
            ScriptedPrompter::answering("admin@example.com", "secret"),
        )
        .login()
        .await
        .unwrap();

        assert_eq!(session.source, CredentialSource::Prompt);
        assert_eq!(store.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_fail() {
        let backend = MemoryBackend::new().with_admin("admin@example.com", "secret");
        let store = Arc::new(MemoryCredentialStore::new());

        let err = manager(
            &backend,
            &store,
            ScriptedPrompter::answering("admin@example.com", "nope"),
        )
        .login()
        .await
        .unwrap_err();

        assert!(matches!(err, CliError::Auth(_)));
        assert!(store.current().is_none());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_admin_not_provisioned() {
        let backend = MemoryBackend::new();
        let store = Arc::new(MemoryCredentialStore::new());

        let err = manager(
            &backend,
            &store,
            ScriptedPrompter::answering("admin@example.com", "secret"),
        )
        .login()
        .await
        .unwrap_err();

        match err {
            CliError::AdminNotProvisioned { url } => assert_eq!(url, URL),
            other => panic!("expected AdminNotProvisioned, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_prompt_cancelled() {
        let backend = MemoryBackend::new().with_admin("admin@example.com", "secret");
        let store = Arc::new(MemoryCredentialStore::new());

        let err = manager(&backend, &store, ScriptedPrompter::default())
            .login()
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Cancelled));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = AdminCredentials::new("admin@example.com", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin@example.com"));
        assert!(!rendered.contains("hunter2"));
    }
}
