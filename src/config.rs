//! Configuration file parser for ~/.config/newsdeck/config.toml.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! usually typos. API keys and base URLs can be overridden from the
//! environment; the environment wins over the file.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::preferences::PreferenceItem;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Connection settings for one news API.
///
/// `base_url` falls back to the client's built-in default when unset.
/// Custom Debug impl masks `api_key`.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Followed sources, categories and authors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub sources: Vec<PreferenceItem>,
    pub categories: Vec<PreferenceItem>,
    pub authors: Vec<PreferenceItem>,
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Articles requested per preference query.
    pub page_size: u32,

    /// How long a cached query result stays fresh, in hours.
    pub cache_stale_hours: u64,

    /// Maximum number of cached query results.
    pub cache_capacity: usize,

    /// Upper bound on in-flight queries during a fan-out.
    pub max_concurrent_queries: usize,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Event Registry (article search and suggestions).
    pub news_api: ApiConfig,

    /// NewsAPI.org (top headlines).
    pub news_org: ApiConfig,

    /// New York Times (most popular).
    pub nyt: ApiConfig,

    pub preferences: PreferencesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 70,
            cache_stale_hours: 10,
            cache_capacity: 256,
            max_concurrent_queries: 16,
            request_timeout_secs: 30,
            news_api: ApiConfig::default(),
            news_org: ApiConfig::default(),
            nyt: ApiConfig::default(),
            preferences: PreferencesConfig::default(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "page_size",
        "cache_stale_hours",
        "cache_capacity",
        "max_concurrent_queries",
        "request_timeout_secs",
        "news_api",
        "news_org",
        "nyt",
        "preferences",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            preferences = config.preferences.sources.len()
                + config.preferences.categories.len()
                + config.preferences.authors.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup` (an environment-like source).
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        for (prefix, api) in [
            ("NEWS_API", &mut self.news_api),
            ("NEWS_ORG_API", &mut self.news_org),
            ("NYT_API", &mut self.nyt),
        ] {
            if let Some(key) = get(&format!("{prefix}_KEY")) {
                api.api_key = Some(key);
            }
            if let Some(base) = get(&format!("{prefix}_BASE_URL")) {
                api.base_url = Some(base);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
