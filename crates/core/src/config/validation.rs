//! Configuration validation rules.
//!
//! This module provides validation logic for `ClientConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::ClientConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl ClientConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `base_url` is set but is not an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        let base = self.base_url.trim();
        if !base.is_empty() {
            let parsed = url::Url::parse(base)
                .map_err(|e| ConfigError::Invalid { field: "base_url".into(), reason: e.to_string() })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    field: "base_url".into(),
                    reason: format!("unsupported scheme: {}", parsed.scheme()),
                });
            }
        } else {
            tracing::debug!("base_url is empty; request paths must be absolute URLs");
        }

        Ok(())
    }

    /// Base URL, or an error when the caller needs one and none is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `base_url` is empty.
    pub fn require_base_url(&self) -> Result<&str, ConfigError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::Missing {
                field: "base_url".into(),
                hint: "Set SHIFTDESK_BASE_URL environment variable".into(),
            });
        }
        Ok(base)
    }
}
