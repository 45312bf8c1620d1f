//! Configuration management for the media bridge
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Remote media app endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_host")]
    pub host: String,
    #[serde(default = "default_media_port")]
    pub port: u16,
}

/// Host surface API configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_bind")]
    pub bind: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            host: default_media_host(),
            port: default_media_port(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_api_bind(),
            port: default_api_port(),
        }
    }
}

impl MediaConfig {
    /// Host as it must appear inside a URL (IPv6 literals get brackets)
    fn url_host(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    /// Event stream URL: `ws://{host}:{port}/ws`
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/ws", self.url_host(), self.port)
    }

    /// Request URL for a command path such as `/play`
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.url_host(), self.port, path)
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document means "all defaults"
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        validate_host(&self.media.host).context("Invalid media host")?;
        if self.media.port == 0 {
            anyhow::bail!("Media port cannot be 0");
        }

        if self.api.enabled {
            validate_host(&self.api.bind).context("Invalid API bind address")?;
            if self.api.port == 0 {
                anyhow::bail!("API port cannot be 0");
            }
        }

        Ok(())
    }
}

/// Accept anything that looks like an IPv4/IPv6 literal or a DNS name
fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        anyhow::bail!("host cannot be empty");
    }
    if host.chars().any(char::is_whitespace) {
        anyhow::bail!("host '{}' contains whitespace", host);
    }

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if bare.parse::<std::net::IpAddr>().is_ok() {
        return Ok(());
    }

    let plausible_name = bare.len() <= 253
        && bare.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });

    if !plausible_name {
        anyhow::bail!("host '{}' is neither an IP address nor a host name", host);
    }

    Ok(())
}

// Default value functions
fn default_media_host() -> String { "localhost".to_string() }
fn default_media_port() -> u16 { 6262 }
fn default_api_bind() -> String { "127.0.0.1".to_string() }
fn default_api_port() -> u16 { 8126 }
fn default_true() -> bool { true }
