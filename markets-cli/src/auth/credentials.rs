//! Encrypted admin credential cache.
//!
//! Each field is encrypted on its own with AES-256-GCM. The key is derived
//! from strings identifying the current user and host, so a cache copied to
//! another machine does not decrypt.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::{CliError, CliResult};

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;
const KEY_SALT: &str = "sa-markets-schema-manager-credentials-v1";

/// Admin credentials as held in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    pub email: String,
    pub password: String,
    pub token: String,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredCredentials {
    /// Credentials stamped now, expiring after `ttl`.
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        token: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            email: email.into(),
            password: password.into(),
            token: token.into(),
            timestamp: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Persistence for cached credentials.
pub trait CredentialStore: Send + Sync {
    /// Load cached credentials. `Ok(None)` when nothing is cached; an error
    /// when the cache exists but cannot be read.
    fn load(&self) -> CliResult<Option<StoredCredentials>>;

    /// Persist credentials, replacing any previous cache.
    fn save(&self, credentials: &StoredCredentials) -> CliResult<()>;

    /// Delete the cache. Succeeds when nothing is cached.
    fn clear(&self) -> CliResult<()>;
}

// =============================================================================
// Cipher
// =============================================================================

/// AES-256-GCM cipher for single credential fields.
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; KEY_LENGTH],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    pub fn new(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Cipher keyed by SHA-256 over user and host identifying strings.
    pub fn for_this_machine() -> Self {
        let mut hasher = Sha256::new();
        for var in ["USER", "USERNAME", "HOSTNAME", "COMPUTERNAME"] {
            hasher.update(std::env::var(var).unwrap_or_default().as_bytes());
            hasher.update([0u8]);
        }
        if let Some(home) = dirs::home_dir() {
            hasher.update(home.to_string_lossy().as_bytes());
        }
        hasher.update(std::env::consts::OS.as_bytes());
        hasher.update(std::env::consts::ARCH.as_bytes());
        hasher.update(KEY_SALT.as_bytes());

        let digest = hasher.finalize();
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&digest);
        Self::new(key)
    }

    /// Encrypt to base64 of nonce || ciphertext || tag.
    pub fn encrypt(&self, plaintext: &str) -> CliResult<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CliError::credentials(format!("failed to create cipher: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CliError::credentials(format!("encryption failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt a value produced by [`FieldCipher::encrypt`].
    pub fn decrypt(&self, encoded: &str) -> CliResult<String> {
        let data = STANDARD
            .decode(encoded)
            .map_err(|e| CliError::credentials(format!("invalid base64: {e}")))?;
        if data.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(CliError::credentials("ciphertext too short"));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| CliError::credentials(format!("failed to create cipher: {e}")))?;
        let (nonce_bytes, encrypted) = data.split_at(NONCE_LENGTH);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), encrypted)
            .map_err(|e| CliError::credentials(format!("decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| CliError::credentials(format!("decrypted data is not valid UTF-8: {e}")))
    }
}

// =============================================================================
// File store
// =============================================================================

/// On-disk layout: every field encrypted separately.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptedCredentials {
    email: String,
    password: String,
    token: String,
    timestamp: String,
    expires_at: String,
}

/// Credential cache stored as an encrypted JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    cipher: FieldCipher,
}

impl FileCredentialStore {
    /// Store at `path` keyed to this machine.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_cipher(path, FieldCipher::for_this_machine())
    }

    pub fn with_cipher(path: impl Into<PathBuf>, cipher: FieldCipher) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decrypt_time(&self, value: &str) -> CliResult<DateTime<Utc>> {
        let raw = self.cipher.decrypt(value)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| CliError::credentials(format!("invalid timestamp: {e}")))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> CliResult<Option<StoredCredentials>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let encrypted: EncryptedCredentials = serde_json::from_str(&content)
            .map_err(|e| CliError::credentials(format!("invalid cache file: {e}")))?;

        Ok(Some(StoredCredentials {
            email: self.cipher.decrypt(&encrypted.email)?,
            password: self.cipher.decrypt(&encrypted.password)?,
            token: self.cipher.decrypt(&encrypted.token)?,
            timestamp: self.decrypt_time(&encrypted.timestamp)?,
            expires_at: self.decrypt_time(&encrypted.expires_at)?,
        }))
    }

    fn save(&self, credentials: &StoredCredentials) -> CliResult<()> {
        let encrypted = EncryptedCredentials {
            email: self.cipher.encrypt(&credentials.email)?,
            password: self.cipher.encrypt(&credentials.password)?,
            token: self.cipher.encrypt(&credentials.token)?,
            timestamp: self.cipher.encrypt(&credentials.timestamp.to_rfc3339())?,
            expires_at: self.cipher.encrypt(&credentials.expires_at.to_rfc3339())?,
        };
        let content = serde_json::to_string_pretty(&encrypted)
            .map_err(|e| CliError::credentials(format!("failed to serialize cache: {e}")))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %self.path.display(), "saved credential cache");
        Ok(())
    }

    fn clear(&self) -> CliResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "cleared credential cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Memory store
// =============================================================================

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    credentials: Option<StoredCredentials>,
    corrupt: bool,
    saves: usize,
    clears: usize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        let store = Self::new();
        store.state.lock().credentials = Some(credentials);
        store
    }

    /// Store whose load fails as if the cache were unreadable.
    pub fn corrupt() -> Self {
        let store = Self::new();
        store.state.lock().corrupt = true;
        store
    }

    pub fn current(&self) -> Option<StoredCredentials> {
        self.state.lock().credentials.clone()
    }

    pub fn save_count(&self) -> usize {
        self.state.lock().saves
    }

    pub fn clear_count(&self) -> usize {
        self.state.lock().clears
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> CliResult<Option<StoredCredentials>> {
        let state = self.state.lock();
        if state.corrupt {
            return Err(CliError::credentials("decryption failed"));
        }
        Ok(state.credentials.clone())
    }

    fn save(&self, credentials: &StoredCredentials) -> CliResult<()> {
        let mut state = self.state.lock();
        state.credentials = Some(credentials.clone());
        state.corrupt = false;
        state.saves += 1;
        Ok(())
    }

    fn clear(&self) -> CliResult<()> {
        let mut state = self.state.lock();
        state.credentials = None;
        state.corrupt = false;
        state.clears += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> StoredCredentials {
        StoredCredentials::new("admin@example.com", "s3cret!", "tok_123", Duration::days(7))
    }

    #[test]
    fn test_cipher_round_trip() {
        let cipher = FieldCipher::new([7u8; KEY_LENGTH]);
        let encrypted = cipher.encrypt("hunter2").unwrap();

        assert_ne!(encrypted, "hunter2");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "hunter2");
    }

    #[test]
    fn test_cipher_random_nonce() {
        let cipher = FieldCipher::new([7u8; KEY_LENGTH]);
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn test_cipher_wrong_key() {
        let encrypted = FieldCipher::new([1u8; KEY_LENGTH]).encrypt("x").unwrap();
        assert!(FieldCipher::new([2u8; KEY_LENGTH]).decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_cipher_too_short() {
        let cipher = FieldCipher::new([1u8; KEY_LENGTH]);
        let err = cipher.decrypt(&STANDARD.encode([0u8; 8])).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("credentials.json"));
        let creds = sample();

        store.save(&creds).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.email, creds.email);
        assert_eq!(loaded.password, creds.password);
        assert_eq!(loaded.token, creds.token);
        assert_eq!(loaded.expires_at.timestamp(), creds.expires_at.timestamp());
        assert!(!loaded.is_expired());
    }

    #[test]
    fn test_file_store_fields_encrypted() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.save(&sample()).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("admin@example.com"));
        assert!(!raw.contains("s3cret!"));
        assert!(raw.contains("\"expiresAt\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.save(&sample()).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_missing() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{\"email\": \"not encrypted\"}").unwrap();

        assert!(FileCredentialStore::new(&path).load().is_err());
    }

    #[test]
    fn test_file_store_other_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        FileCredentialStore::with_cipher(&path, FieldCipher::new([3u8; KEY_LENGTH]))
            .save(&sample())
            .unwrap();

        let store = FileCredentialStore::with_cipher(&path, FieldCipher::new([4u8; KEY_LENGTH]));
        assert!(store.load().is_err());
    }

    #[test]
    fn test_file_store_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        store.save(&sample()).unwrap();

        store.clear().unwrap();

        assert!(!store.path().exists());
    }

    #[test]
    fn test_expiry() {
        assert!(!sample().is_expired());
        let expired =
            StoredCredentials::new("a@example.com", "pw", "tok", Duration::seconds(-1));
        assert!(expired.is_expired());
    }
}
