//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
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

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `app_name` or `cache_version` is empty or contains whitespace,
    ///   or `cache_version` contains a dash (it would blur bucket names)
    /// - `origin` is not an absolute http(s) URL
    /// - a static extension does not start with a dot
    /// - `home_path` or a precache entry is not an absolute path or URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Missing {
                field: "user_agent".into(),
                hint: "Set ORRERY_USER_AGENT environment variable".into(),
            });
        }

        if self.app_name.is_empty() || self.app_name.chars().any(char::is_whitespace) {
            return Err(invalid("app_name", "must be non-empty without whitespace"));
        }
        if self.cache_version.is_empty() || self.cache_version.chars().any(|c| c.is_whitespace() || c == '-') {
            return Err(invalid("cache_version", "must be non-empty without whitespace or dashes"));
        }

        let origin_ok = url::Url::parse(&self.origin)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .unwrap_or(false);
        if !origin_ok {
            return Err(invalid("origin", "must be an absolute http(s) URL"));
        }

        if let Some(ext) = self.static_extensions.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
            return Err(ConfigError::Invalid {
                field: "static_extensions".into(),
                reason: format!("'{ext}' must start with a dot"),
            });
        }

        if !self.home_path.starts_with('/') {
            return Err(invalid("home_path", "must be an absolute site path"));
        }

        if let Some(entry) = self
            .precache
            .iter()
            .find(|p| !p.starts_with('/') && !p.starts_with("http://") && !p.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                field: "precache".into(),
                reason: format!("'{entry}' must be a site path or absolute URL"),
            });
        }

        if self.precache.is_empty() {
            tracing::warn!("precache manifest is empty; offline support starts cold");
        }

        if self.precache_strict && self.precache.is_empty() {
            tracing::warn!("precache_strict has no effect with an empty manifest");
        }

        Ok(())
    }
}
