use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::theme::ThemeMode;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// On-disk configuration. Every field is optional; missing ones fall back
/// to command-line values or built-in defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub endpoint: Option<String>,
    pub theme: Option<ThemeMode>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatbox").join("config.json"))
    }
}

/// Values given on the command line (or through the environment).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub theme: Option<ThemeMode>,
    pub timeout_secs: Option<u64>,
}

/// Startup configuration handed to the widget.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: String,
    pub theme: ThemeMode,
    pub request_timeout: Duration,
}

impl Settings {
    /// Overrides win over the config file, which wins over the terminal's
    /// own colour hint and the defaults.
    pub fn resolve(overrides: Overrides, config: Config, detected_theme: Option<ThemeMode>) -> Self {
        let endpoint = overrides
            .endpoint
            .or(config.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let theme = overrides
            .theme
            .or(config.theme)
            .or(detected_theme)
            .unwrap_or_default();

        // A zero deadline would fail every request immediately
        let timeout_secs = overrides
            .timeout_secs
            .or(config.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            endpoint,
            theme,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}
