//! Configuration management for cvopt.
//!
//! Loads configuration from ${CVOPT_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::client::RetryPolicy;

pub mod paths {
    //! Path resolution for cvopt configuration and data directories.
    //!
    //! CVOPT_HOME resolution order:
    //! 1. CVOPT_HOME environment variable (if set)
    //! 2. ~/.config/cvopt (default)

    use std::path::PathBuf;

    /// Returns the cvopt home directory.
    ///
    /// Checks CVOPT_HOME env var first, falls back to ~/.config/cvopt
    /// (or `./.cvopt` when no home directory can be determined).
    pub fn cvopt_home() -> PathBuf {
        if let Ok(home) = std::env::var("CVOPT_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".cvopt"),
            |h| h.join(".config").join("cvopt"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        cvopt_home().join("config.toml")
    }

    /// Returns the path to the persisted session.
    pub fn session_path() -> PathBuf {
        cvopt_home().join(crate::session::SESSION_FILE)
    }

    /// Returns the directory rolled log files are written to.
    pub fn logs_dir() -> PathBuf {
        cvopt_home().join("logs")
    }
}

/// Hosted backend used when neither env nor config names one.
pub const DEFAULT_API_URL: &str = "https://cv-optimizer-backend-6qbt.onrender.com";

/// Environment variable overriding the configured API URL.
pub const API_URL_ENV: &str = "CVOPT_API_URL";

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the CV optimizer API
    pub api_url: Option<String>,

    /// Request timeout in seconds (0 disables)
    pub request_timeout_secs: u64,

    /// Ask the service for AI suggestions alongside the ATS score
    pub include_ai: bool,

    /// Extra attempts for read-only requests that fail transiently
    pub read_retries: u32,

    /// Base delay between retries in milliseconds
    pub retry_backoff_ms: u64,

    /// Log filter used when CVOPT_LOG is unset
    pub log_level: String,
}

impl Config {
    /// Free-tier hosts cold-start slowly; analysis with AI can take a while.
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
    const DEFAULT_READ_RETRIES: u32 = 2;
    const MAX_READ_RETRIES: u32 = 2;
    const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
    const DEFAULT_LOG_LEVEL: &str = "info";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes the commented default template to `path`.
    ///
    /// # Errors
    /// Fails if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Resolves the API base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL does not parse.
    pub fn resolve_api_url(&self) -> Result<String> {
        if let Ok(env_url) = std::env::var(API_URL_ENV) {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }

        if let Some(config_url) = self.api_url.as_deref() {
            let trimmed = config_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }

        Ok(DEFAULT_API_URL.to_string())
    }

    /// Per-request timeout, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Read retries are capped at two extra attempts whatever the file says.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.read_retries.min(Self::MAX_READ_RETRIES),
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            include_ai: true,
            read_retries: Self::DEFAULT_READ_RETRIES,
            retry_backoff_ms: Self::DEFAULT_RETRY_BACKOFF_MS,
            log_level: Self::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(())
}
