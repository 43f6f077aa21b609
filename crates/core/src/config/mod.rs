//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ORRERY_*)
//! 2. TOML config file (if ORRERY_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheNamespace;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ORRERY_*)
/// 2. TOML config file (if ORRERY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name, the first segment of every bucket name.
    ///
    /// Set via ORRERY_APP_NAME environment variable.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Cache version. Bumping it invalidates all buckets of prior versions
    /// at the next activation.
    ///
    /// Set via ORRERY_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin the site is served from. Site paths resolve against it.
    ///
    /// Set via ORRERY_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via ORRERY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via ORRERY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via ORRERY_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network timeout in milliseconds. A fetch that takes longer counts as
    /// a network failure.
    ///
    /// Set via ORRERY_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Site paths fetched into the static bucket at install time.
    ///
    /// Set via ORRERY_PRECACHE environment variable (`[a, b]` array syntax).
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Host or path substrings identifying API requests.
    ///
    /// Set via ORRERY_API_PATTERNS environment variable.
    #[serde(default = "default_api_patterns")]
    pub api_patterns: Vec<String>,

    /// File extensions (with leading dot) identifying static assets.
    ///
    /// Set via ORRERY_STATIC_EXTENSIONS environment variable.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Site home page served when a document is offline and uncached.
    ///
    /// Set via ORRERY_HOME_PATH environment variable.
    #[serde(default = "default_home_path")]
    pub home_path: String,

    /// Whether any precache failure aborts installation.
    ///
    /// Set via ORRERY_PRECACHE_STRICT environment variable.
    #[serde(default)]
    pub precache_strict: bool,
}

fn default_app_name() -> String {
    "solar-system-explorer".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./orrery-cache.sqlite")
}

fn default_user_agent() -> String {
    "orrery/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/pages/planets.html",
        "/pages/simulator.html",
        "/pages/dashboard.html",
        "/pages/quiz.html",
        "/css/style.css",
        "/css/themes.css",
        "/js/main.js",
        "/js/simulator.js",
        "/js/charts.js",
        "/js/i18n.js",
        "/images/icon-192.png",
        "/images/icon-512.png",
        "/manifest.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_patterns() -> Vec<String> {
    vec!["api.nasa.gov".into(), "/api/".into()]
}

fn default_static_extensions() -> Vec<String> {
    [".css", ".js", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".woff", ".woff2", ".ttf"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_home_path() -> String {
    "/".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            precache: default_precache(),
            api_patterns: default_api_patterns(),
            static_extensions: default_static_extensions(),
            home_path: default_home_path(),
            precache_strict: false,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Bucket namespace for the configured app name and version.
    pub fn namespace(&self) -> CacheNamespace {
        CacheNamespace::new(&self.app_name, &self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ORRERY_`
    /// 2. TOML file from `ORRERY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ORRERY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ORRERY_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML string layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the TOML cannot be parsed or validation fails.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml))
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
