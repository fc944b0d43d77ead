//! Client configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHIFTDESK_*)
//! 2. TOML config file (if SHIFTDESK_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Default per-attempt request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 18_000;

/// Client configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHIFTDESK_*)
/// 2. TOML config file (if SHIFTDESK_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the remote API, e.g. `https://api.example.com`.
    ///
    /// Set via SHIFTDESK_BASE_URL environment variable. When empty, request
    /// paths must already be absolute URLs.
    #[serde(default)]
    pub base_url: String,

    /// Per-attempt request timeout in milliseconds.
    ///
    /// Set via SHIFTDESK_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Path to the SQLite file holding the persisted bearer token.
    ///
    /// Set via SHIFTDESK_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHIFTDESK_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether every fired request is logged at debug level.
    ///
    /// Set via SHIFTDESK_NETWORK_LOG environment variable.
    #[serde(default = "default_true")]
    pub network_log: bool,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shiftdesk.sqlite")
}

fn default_user_agent() -> String {
    "shiftdesk/0.1".into()
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: default_timeout_ms(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            network_log: true,
        }
    }
}

impl ClientConfig {
    /// Timeout as Duration for use with tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(std::env::var_os("SHIFTDESK_CONFIG_FILE").map(PathBuf::from).as_deref())
    }

    /// Like [`ClientConfig::load`], reading the TOML layer from `config_file`
    /// instead of SHIFTDESK_CONFIG_FILE.
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_path) = config_file {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHIFTDESK_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    /// Extract and validate a configuration from a prepared figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
