//! Configuration management for selfiebox.
//!
//! Loads configuration from ${SELFIEBOX_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Telegram transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token for Telegram API.
    pub bot_token: Option<String>,
    /// Long-polling timeout for getUpdates.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            poll_timeout_secs: 30,
        }
    }
}

/// Background-removal service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            endpoint: SegmentationConfig::DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl SegmentationConfig {
    pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:7000/api/remove";

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Compositing limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Wall-clock budget for one composite in seconds (0 disables)
    pub timeout_secs: u64,
    /// Composites allowed to run at the same time
    pub max_concurrent: usize,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 180,
            max_concurrent: 2,
        }
    }
}

impl CompositorConfig {
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter used when RUST_LOG is unset
    pub log_level: Option<String>,
    /// Optional log file; logs go to stderr otherwise
    pub log_file: Option<String>,
    pub telegram: TelegramConfig,
    pub segmentation: SegmentationConfig,
    pub compositor: CompositorConfig,
}

/// Returns the default config template with comments.
pub fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        if config.compositor.max_concurrent == 0 {
            bail!("compositor.max_concurrent must be at least 1");
        }
        Ok(config)
    }

    /// Writes the commented template to `path`.
    ///
    /// Fails if the file already exists.
    pub fn init_at(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Bot token from config, then SELFIEBOX_TELEGRAM_BOT_TOKEN, then TELEGRAM_BOT_TOKEN.
    pub fn telegram_bot_token(&self) -> Option<String> {
        self.telegram
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .or_else(|| env_non_empty("SELFIEBOX_TELEGRAM_BOT_TOKEN"))
            .or_else(|| env_non_empty("TELEGRAM_BOT_TOKEN"))
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub mod paths {
    //! Path resolution for selfiebox configuration.
    //!
    //! SELFIEBOX_HOME resolution order:
    //! 1. SELFIEBOX_HOME environment variable (if set)
    //! 2. ~/.config/selfiebox (default)
    //! 3. ./.selfiebox when no home directory is known

    use std::path::PathBuf;

    pub fn selfiebox_home() -> PathBuf {
        if let Ok(home) = std::env::var("SELFIEBOX_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("selfiebox"))
            .unwrap_or_else(|| PathBuf::from(".selfiebox"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        selfiebox_home().join("config.toml")
    }
}
