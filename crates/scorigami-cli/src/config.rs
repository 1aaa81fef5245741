//! Configuration management for the scorigami CLI.

use anyhow::{Context, Result};
use scorigami_runtime::encoder::EncoderConfig;
use scorigami_runtime::layout::LayoutOptions;
use scorigami_runtime::reducer::ReducerConfig;
use scorigami_runtime::synthetic::SyntheticConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "scorigami.toml";

/// Project configuration, read from `scorigami.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stream: EncoderConfig,
    #[serde(default)]
    pub reducer: ReducerConfig,
    #[serde(default)]
    pub layout: LayoutOptions,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

/// Where local commands read aggregates from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite aggregate database.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// JSON fixture; takes precedence over `path` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of a running `scorigami-web`.
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("scorigami.db")
}

fn default_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            fixture: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load config from scorigami.toml in the current or parent directories.
    pub fn load() -> Result<Self> {
        match find_config_file() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        // relative store paths are relative to the config file
        if let Some(dir) = path.parent() {
            config.store.resolve_relative_to(dir);
        }
        Ok(config)
    }

    /// Save config to the specified path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

impl StoreConfig {
    fn resolve_relative_to(&mut self, dir: &Path) {
        if self.path.is_relative() {
            self.path = dir.join(&self.path);
        }
        if let Some(fixture) = self.fixture.as_mut() {
            if fixture.is_relative() {
                *fixture = dir.join(&*fixture);
            }
        }
    }
}

/// Find scorigami.toml in current or parent directories.
fn find_config_file() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}
