//! Configuration System
//!
//! Layered configuration for the synchronization CLI and for library callers that
//! want the same settings: merge-policy defaults, then the user-level file, then
//! workspace files, then `EMOTE_SYNC__*` environment variables.

use crate::content::directory::DEFAULT_EXTENSIONS;
use crate::error::SyncError;
use crate::logging::LoggingConfig;
use crate::registry::HttpRegistryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where emote bytes come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Directory of emote images, relative to the workspace root unless absolute
    #[serde(default = "default_content_directory")]
    pub directory: PathBuf,

    /// Accepted image extensions
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_content_directory() -> PathBuf {
    PathBuf::from("emotes")
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            directory: default_content_directory(),
            extensions: default_extensions(),
        }
    }
}

/// Remote registry connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub base_url: Option<String>,

    /// Collection (server, guild, workspace) whose emojis are managed
    pub collection: Option<String>,

    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_token_env() -> String {
    "EMOTE_SYNC_TOKEN".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            collection: None,
            token_env: default_token_env(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RegistryConfig {
    /// Build HTTP client settings, reading the token from `token_env` if it is set
    pub fn to_http_config(&self) -> Result<HttpRegistryConfig, SyncError> {
        let base_url = self
            .base_url
            .clone()
            .ok_or_else(|| SyncError::ConfigError("registry.base_url is not set".to_string()))?;
        let collection = self
            .collection
            .clone()
            .ok_or_else(|| SyncError::ConfigError("registry.collection is not set".to_string()))?;

        let mut http = HttpRegistryConfig::new(base_url, collection);
        http.token = std::env::var(&self.token_env).ok().filter(|t| !t.is_empty());
        http.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        http.request_timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(http)
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(base_url) = &self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(format!("base_url must be an http(s) URL, got '{}'", base_url));
            }
        }
        if let Some(collection) = &self.collection {
            if collection.trim().is_empty() || collection.contains('/') {
                return Err(format!("invalid collection '{}'", collection));
            }
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err("timeouts must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Where the CLI keeps the ledger between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("emote-ledger.json")
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

/// Where the CLI reads the desired-state manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_path")]
    pub path: PathBuf,
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("emotes.toml")
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Content(String),
    Registry(String),
    Path(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Content(msg) => write!(f, "Content: {}", msg),
            ValidationError::Registry(msg) => write!(f, "Registry: {}", msg),
            ValidationError::Path(msg) => write!(f, "Path: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl SyncConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.content.directory.as_os_str().is_empty() {
            errors.push(ValidationError::Content(
                "content directory cannot be empty".to_string(),
            ));
        }
        if self.content.extensions.is_empty() {
            errors.push(ValidationError::Content(
                "at least one extension is required".to_string(),
            ));
        }
        if let Err(e) = self.registry.validate() {
            errors.push(ValidationError::Registry(e));
        }
        if self.ledger.path.as_os_str().is_empty() {
            errors.push(ValidationError::Path("ledger path cannot be empty".to_string()));
        }
        if self.manifest.path.as_os_str().is_empty() {
            errors.push(ValidationError::Path(
                "manifest path cannot be empty".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one error
    pub fn validated(self) -> Result<Self, SyncError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            SyncError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(self)
    }

    pub fn content_directory(&self, workspace_root: &Path) -> PathBuf {
        resolve(workspace_root, &self.content.directory)
    }

    pub fn ledger_path(&self, workspace_root: &Path) -> PathBuf {
        resolve(workspace_root, &self.ledger.path)
    }

    pub fn manifest_path(&self, workspace_root: &Path) -> PathBuf {
        resolve(workspace_root, &self.manifest.path)
    }
}

fn resolve(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}
