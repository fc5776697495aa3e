//! Configuration management for Chatsync
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ChatsyncError, Result};
use crate::sync::SyncOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Chatsync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote session store connection settings
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Sync engine behavior
    #[serde(default)]
    pub sync: SyncConfig,
    /// Local cache persistence
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the remote session API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Static headers added to every request (e.g. an API key)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            headers: HashMap::new(),
        }
    }
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Upper bound on each remote call (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Prefix of default titles given to untitled new sessions
    #[serde(default = "default_title_prefix")]
    pub default_title_prefix: String,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_title_prefix() -> String {
    "Chat".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            default_title_prefix: default_title_prefix(),
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the SQLite cache database; platform data dir when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed command line, whose flags win over everything else
    ///
    /// # Returns
    ///
    /// Returns the merged configuration, or an error if the file exists but
    /// cannot be parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatsyncError::Config(format!("Failed to read {}: {}", path, e)))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("CHATSYNC_BASE_URL") {
            tracing::debug!(base_url = %base_url, "Env override: CHATSYNC_BASE_URL");
            self.gateway.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("CHATSYNC_REQUEST_TIMEOUT") {
            if let Ok(value) = timeout.parse() {
                self.sync.request_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid CHATSYNC_REQUEST_TIMEOUT: {}", timeout);
            }
        }

        if let Ok(db) = std::env::var("CHATSYNC_DB") {
            self.storage.db_path = Some(PathBuf::from(db));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            self.gateway.base_url = base_url.clone();
        }
        if let Some(db) = &cli.db {
            self.storage.db_path = Some(db.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ChatsyncError::Config` if the base URL is not an absolute
    /// http(s) URL, the timeout is zero, or the title prefix is blank
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChatsyncError::Config(format!(
                "gateway.base_url must use http or https, got: {}",
                url.scheme()
            ))
            .into());
        }

        if self.sync.request_timeout_seconds == 0 {
            return Err(ChatsyncError::Config(
                "sync.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.sync.default_title_prefix.trim().is_empty() {
            return Err(ChatsyncError::Config(
                "sync.default_title_prefix cannot be empty".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Parsed gateway base URL
    pub fn base_url(&self) -> Result<url::Url> {
        url::Url::parse(&self.gateway.base_url).map_err(|e| {
            ChatsyncError::Config(format!(
                "Invalid gateway.base_url '{}': {}",
                self.gateway.base_url, e
            ))
            .into()
        })
    }

    /// Per-request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.request_timeout_seconds)
    }

    /// Engine options derived from this configuration
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            request_timeout: self.request_timeout(),
            default_title_prefix: self.sync.default_title_prefix.clone(),
        }
    }
}
