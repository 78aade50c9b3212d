//! TOML settings for the weft engine: history size, normalization guard
//! and selection warnings.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Default cap on saved undo batches
pub const DEFAULT_MAX_UNDOS: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// History settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of saved batches kept on the undo stack
    pub max_undos: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undos: DEFAULT_MAX_UNDOS,
        }
    }
}

/// Schema normalization settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Iteration guard per node. `0` means "one iteration per schema rule".
    pub max_iterations: usize,
}

/// Selection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Log a warning when normalization resets a selection pointing at removed nodes
    pub warn_on_reset: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            warn_on_reset: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub normalize: NormalizeConfig,
    pub selection: SelectionConfig,
}

impl Config {
    /// Parse settings from TOML text. Missing sections and fields keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the settings at `config_path`, which may start with `~`.
    /// `Ok(None)` when there is no file there.
    pub fn load_from_path(config_path: &str) -> Result<Option<Self>, ConfigError> {
        let config_path = expand(config_path);
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.clone(),
                source,
            }
        })?;

        Self::from_toml(&content)
            .map(Some)
            .map_err(|source| ConfigError::ConfigParseError {
                config_path,
                source,
            })
    }

    /// Like `load_from_path`, with the defaults standing in for a missing file
    pub fn load_or_default(config_path: &str) -> Result<Self, ConfigError> {
        Ok(Self::load_from_path(config_path)?.unwrap_or_default())
    }

    /// Write the settings to `config_path`, creating its directory if needed
    pub fn save_to_path(&self, config_path: &str) -> anyhow::Result<()> {
        let config_path = expand(config_path);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("writing {}", config_path.display()))
    }
}

fn expand(config_path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(config_path).as_ref())
}
