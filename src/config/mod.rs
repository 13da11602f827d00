//! Configuration management for ollama-agent

use crate::agent::SessionOptions;
use crate::llm::{ErrorMode, DEFAULT_MODEL, DEFAULT_URL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Full URL of the chat endpoint
    pub url: String,
    pub model: String,
    /// Request timeout in seconds; 0 disables it
    pub timeout_secs: u64,
    /// Model options forwarded with every request (temperature, num_ctx, ...)
    pub options: HashMap<String, Value>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 0,
            options: HashMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub error_mode: ErrorMode,
    pub keep_history: bool,
    pub max_tool_rounds: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let defaults = SessionOptions::default();
        Self {
            error_mode: defaults.error_mode,
            keep_history: defaults.keep_history,
            max_tool_rounds: defaults.max_tool_rounds,
        }
    }
}

impl ChatConfig {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            error_mode: self.error_mode,
            keep_history: self.keep_history,
            max_tool_rounds: self.max_tool_rounds,
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ollama-agent")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
