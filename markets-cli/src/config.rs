//! CLI configuration handling.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::error::{CliError, CliResult};

/// Default config file name (lives in the working directory)
pub const CONFIG_FILE_NAME: &str = "markets.toml";

/// Default backend URL
pub const DEFAULT_URL: &str = "http://127.0.0.1:8090";

/// Default declared schema path (relative to the working directory)
pub const SCHEMA_FILE_PATH: &str = "pocketbase/schema.json";

/// Default generated schema path (relative to the working directory)
pub const GENERATED_SCHEMA_PATH: &str = "pocketbase/generated-schema.json";

/// Default run log file
pub const LOG_FILE_NAME: &str = "schema-manager.log";

/// Credential cache directory (relative to the home directory)
pub const CREDENTIALS_DIR: &str = ".sa-markets";

/// Credential cache file name
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Days a cached credential stays valid
pub const CREDENTIAL_TTL_DAYS: i64 = 7;

/// Longest accepted credential lifetime
pub const MAX_CREDENTIAL_TTL_DAYS: i64 = 365;

/// schema-manager configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend configuration
    pub server: ServerConfig,

    /// Schema file locations
    pub schema: SchemaConfig,

    /// Run log configuration
    pub log: LogConfig,

    /// Credential cache configuration
    pub credentials: CredentialsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a file, or use defaults if it does not exist
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Backend base URL
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
        }
    }
}

/// Schema file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Declared schema path
    pub path: PathBuf,

    /// Where `generate` writes the live schema
    pub generated_path: PathBuf,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(SCHEMA_FILE_PATH),
            generated_path: PathBuf::from(GENERATED_SCHEMA_PATH),
        }
    }
}

/// Run log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Run log file, overwritten on every run
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(LOG_FILE_NAME),
        }
    }
}

/// Credential cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Cache file (defaults to `~/.sa-markets/credentials.json`)
    pub path: Option<PathBuf>,

    /// Days a cached credential stays valid
    pub ttl_days: i64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: None,
            ttl_days: CREDENTIAL_TTL_DAYS,
        }
    }
}

impl CredentialsConfig {
    /// The cache file path, falling back to the home directory default.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(CREDENTIALS_DIR)
                .join(CREDENTIALS_FILE_NAME),
        }
    }

    /// The cache lifetime, rejecting values outside `1..=365` days.
    pub fn ttl(&self) -> CliResult<Duration> {
        if !(1..=MAX_CREDENTIAL_TTL_DAYS).contains(&self.ttl_days) {
            return Err(CliError::Config(format!(
                "credentials.ttl_days must be between 1 and {}, got {}",
                MAX_CREDENTIAL_TTL_DAYS, self.ttl_days
            )));
        }
        Duration::try_days(self.ttl_days).ok_or_else(|| {
            CliError::Config(format!("credentials.ttl_days out of range: {}", self.ttl_days))
        })
    }
}
