//! PocketBase REST client (reqwest-based).

use async_trait::async_trait;
use markets_schema::CollectionDef;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::backend::{AdminAuthenticator, RecordBackend, SchemaBackend};
use crate::error::{MigrateResult, MigrationError, body_message};

/// Legacy admin password auth endpoint.
pub const ADMIN_AUTH_PATH: &str = "/api/admins/auth-with-password";

/// Superuser password auth endpoint used by newer servers.
pub const SUPERUSER_AUTH_PATH: &str = "/api/collections/_superusers/auth-with-password";

/// Page size used when listing.
const PER_PAGE: u32 = 200;

/// One page of a paginated list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage<T> {
    page: u32,
    total_pages: u32,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

/// HTTP client for a PocketBase-style backend.
#[derive(Debug)]
pub struct PocketBaseClient {
    base_url: String,
    http_client: Client,
    token: RwLock<Option<String>>,
}

impl PocketBaseClient {
    /// Create a new client.
    pub fn new(base_url: impl Into<String>) -> MigrateResult<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("sa-markets-schema-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MigrationError::other(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_http_client(base_url, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_http_client(base_url: impl Into<String>, http_client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http_client,
            token: RwLock::new(None),
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Install a session token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Drop the session token.
    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    /// The current session token.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Check if a session token is installed.
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Authenticate as admin, falling back to the superuser endpoint when the
    /// legacy admin endpoint does not exist.
    pub async fn authenticate_admin(&self, email: &str, password: &str) -> MigrateResult<String> {
        let body = json!({ "identity": email, "password": password });

        let auth: AuthResponse = match self.send(Method::POST, ADMIN_AUTH_PATH, Some(&body)).await {
            Ok(auth) => auth,
            Err(e) if e.is_not_found() => {
                debug!("admin auth endpoint not found, trying superuser endpoint");
                self.send(Method::POST, SUPERUSER_AUTH_PATH, Some(&body)).await?
            }
            Err(e) => return Err(e),
        };

        self.set_token(auth.token.clone());
        debug!(email, "authenticated as admin");
        Ok(auth.token)
    }

    /// Fetch one collection by id or name.
    pub async fn get_collection(&self, id_or_name: &str) -> MigrateResult<CollectionDef> {
        self.send(Method::GET, &format!("/api/collections/{id_or_name}"), None)
            .await
    }

    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> MigrateResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let url = format!("{path}?page={page}&perPage={PER_PAGE}");
            let result: ListPage<T> = self.send(Method::GET, &url, None).await?;
            items.extend(result.items);
            if result.page >= result.total_pages {
                break;
            }
            page = result.page + 1;
        }
        Ok(items)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http_client.request(method, url);
        match self.token.read().as_deref() {
            Some(token) => builder.header("Authorization", token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> MigrateResult<T> {
        let mut builder = self.request(method.clone(), path);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(%method, path, "backend request");
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        self.handle_response(response).await
    }

    async fn send_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> MigrateResult<T> {
        let body = serde_json::to_value(body)?;
        self.send(method, path, Some(&body)).await
    }

    fn transport_error(&self, err: reqwest::Error) -> MigrationError {
        if err.is_connect() {
            MigrationError::connection(&self.base_url, err.to_string())
        } else {
            MigrationError::Http(err)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> MigrateResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(status = status.as_u16(), "backend rejected credentials");
                Err(MigrationError::unauthorized(body_message(
                    status.as_u16(),
                    &body,
                )))
            }
            _ => Err(MigrationError::api(status.as_u16(), body)),
        }
    }
}

#[async_trait]
impl SchemaBackend for PocketBaseClient {
    async fn health(&self) -> MigrateResult<()> {
        let _: Value = self.send(Method::GET, "/api/health", None).await?;
        Ok(())
    }

    async fn list_collections(&self) -> MigrateResult<Vec<CollectionDef>> {
        self.list_all("/api/collections").await
    }

    async fn create_collection(&self, collection: &CollectionDef) -> MigrateResult<CollectionDef> {
        self.send_json(Method::POST, "/api/collections", collection)
            .await
    }

    async fn update_collection(
        &self,
        id_or_name: &str,
        collection: &CollectionDef,
    ) -> MigrateResult<CollectionDef> {
        self.send_json(
            Method::PATCH,
            &format!("/api/collections/{id_or_name}"),
            collection,
        )
        .await
    }
}

#[async_trait]
impl RecordBackend for PocketBaseClient {
    async fn list_records(&self, collection: &str) -> MigrateResult<Vec<Value>> {
        self.list_all(&format!("/api/collections/{collection}/records"))
            .await
    }

    async fn create_record(&self, collection: &str, record: &Value) -> MigrateResult<Value> {
        self.send(
            Method::POST,
            &format!("/api/collections/{collection}/records"),
            Some(record),
        )
        .await
    }
}

#[async_trait]
impl AdminAuthenticator for PocketBaseClient {
    async fn authenticate(&self, email: &str, password: &str) -> MigrateResult<String> {
        self.authenticate_admin(email, password).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = PocketBaseClient::new("http://127.0.0.1:8090/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8090");
    }

    #[test]
    fn test_token_slot() {
        let client = PocketBaseClient::new("http://127.0.0.1:8090").unwrap();
        assert!(!client.is_authenticated());

        client.set_token("abc");
        assert_eq!(client.token().as_deref(), Some("abc"));

        client.clear_token();
        assert!(client.token().is_none());
    }
}
