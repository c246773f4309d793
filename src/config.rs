//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILMAN_RSS_CONFIG` (environment variable)
//! 2. `~/.config/mailman-rss/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailman-rss\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Command-line flags take precedence over anything loaded here.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Feed generation defaults.
    pub feed: FeedConfig,
    /// HTTP fetch settings.
    pub fetch: FetchConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Also append log output to this file.
    pub log_file: Option<PathBuf>,
}

/// Feed generation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Number of messages to emit.
    pub count: usize,
    /// Charset label used to decode every message in the archive.
    pub encoding: String,
    /// Channel `<language>` tag.
    pub language: String,
    /// `strftime` layout of the month directory in reconstructed permalinks.
    pub permalink_month_format: String,
}

/// HTTP fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Maximum accepted response size in bytes, and decompressed size of a month archive.
    pub max_bytes: u64,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_file: None,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            count: 25,
            encoding: "ascii".to_string(),
            language: "ja-JP".to_string(),
            permalink_month_format: "%B-%Y".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("mailman-rss/", env!("CARGO_PKG_VERSION")).to_string(),
            max_bytes: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl FetchConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILMAN_RSS_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailman-rss").join("config.toml"))
}
