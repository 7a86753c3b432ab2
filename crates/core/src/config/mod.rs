//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TRAILHEAD_*)
//! 2. TOML config file (if TRAILHEAD_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::site;

mod validation;

pub use validation::ConfigError;

/// How the interceptor answers requests whose path is not on the allow-list.
///
/// Neither policy writes these responses back to the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PassthroughPolicy {
    /// Answer from the cache when an entry exists, otherwise from the network.
    #[default]
    CacheFirst,
    /// Answer from the network, falling back to the cache when the network fails.
    NetworkFirst,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TRAILHEAD_*)
/// 2. TOML config file (if TRAILHEAD_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the site is served from; allow-listed paths resolve against it.
    ///
    /// Set via TRAILHEAD_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix of every cache generation name.
    ///
    /// Set via TRAILHEAD_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag bumped on each deploy.
    ///
    /// Set via TRAILHEAD_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths pre-cached on install and served cache-first.
    ///
    /// Set via TRAILHEAD_PRECACHE_PATHS environment variable (TOML array syntax).
    #[serde(default = "site::precache_paths")]
    pub precache_paths: Vec<String>,

    /// Policy for paths outside the allow-list.
    ///
    /// Set via TRAILHEAD_PASSTHROUGH_POLICY (`cache-first` or `network-first`).
    #[serde(default)]
    pub passthrough_policy: PassthroughPolicy,

    /// Path to SQLite cache database.
    ///
    /// Set via TRAILHEAD_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via TRAILHEAD_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via TRAILHEAD_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest response body stored as a cache entry. Larger responses are
    /// still returned, just not cached.
    ///
    /// Set via TRAILHEAD_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Number of allow-listed paths fetched concurrently during install.
    ///
    /// Set via TRAILHEAD_INSTALL_CONCURRENCY environment variable.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,

    /// Well-known path of the worker script fetched by the registration check.
    ///
    /// Set via TRAILHEAD_WORKER_SCRIPT environment variable.
    #[serde(default = "default_worker_script")]
    pub worker_script: String,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_cache_prefix() -> String {
    "trailhead-cache".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./trailhead-cache.sqlite")
}

fn default_user_agent() -> String {
    "trailhead/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_install_concurrency() -> usize {
    4
}

fn default_worker_script() -> String {
    "/service-worker.js".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache_paths: site::precache_paths(),
            passthrough_policy: PassthroughPolicy::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            install_concurrency: default_install_concurrency(),
            worker_script: default_worker_script(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the current cache generation, e.g. `trailhead-cache-v1`.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TRAILHEAD_`
    /// 2. TOML file from `TRAILHEAD_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("TRAILHEAD_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TRAILHEAD_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
