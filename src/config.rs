//! Configuration management for tvstream
//!
//! Settings come from built-in defaults, an optional TOML file and
//! environment overrides, in that order. Config is looked up at
//! ~/.config/tvstream/config.toml unless a path is given. It is never
//! written back.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public IP-echo service
pub const DEFAULT_IP_SERVICE_URL: &str = "https://api.ipify.org?format=json";
/// Application backend handing out stream URLs
pub const DEFAULT_BACKEND_URL: &str = "https://emeltv-backend.vercel.app/stream-url";
/// Device class sent as the `device` query parameter
pub const DEFAULT_DEVICE_CLASS: &str = "samsung";
/// Delay before (re)starting playback after the surface is (re)created
pub const DEFAULT_RESTART_DELAY_MS: u64 = 100;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IP-echo service URL
    pub ip_service_url: String,
    /// Stream backend URL (without query)
    pub backend_url: String,
    /// Device class query parameter
    pub device_class: String,
    /// Delay before starting a session after app start or return to foreground
    pub restart_delay_ms: u64,
    /// HTTP timeout for each resolution request
    pub request_timeout_secs: u64,
    /// User-agent override for the headless host
    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ip_service_url: DEFAULT_IP_SERVICE_URL.to_string(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            device_class: DEFAULT_DEVICE_CLASS.to_string(),
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            request_timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl Config {
    /// Get default config file path (~/.config/tvstream/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tvstream").join("config.toml"))
    }

    /// Load config from the default location, or defaults if absent
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Load config from an explicit file; a bad file is an error
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply environment overrides:
    /// 1. TVSTREAM_IP_SERVICE_URL
    /// 2. TVSTREAM_BACKEND_URL
    /// 3. TVSTREAM_USER_AGENT
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("TVSTREAM_IP_SERVICE_URL") {
            self.ip_service_url = url;
        }
        if let Some(url) = lookup("TVSTREAM_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(ua) = lookup("TVSTREAM_USER_AGENT") {
            self.user_agent = Some(ua);
        }
        self
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}
