//! Configuration loading and parsing

use anyhow::{Context, Result};
use motion_log_decoder::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Passed through to the decoder session unchanged
    #[serde(default)]
    pub decoder: SessionConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// Log prefix, without the `.json.gz` / `.index.gz` suffixes
    pub log: Option<PathBuf>,
    #[serde(default)]
    pub datasets: Vec<String>,
    /// CSV destination (default: stdout)
    pub output: Option<PathBuf>,
}

/// Sample grid, in seconds relative to the start of the log
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SamplingConfig {
    #[serde(default)]
    pub start: f64,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "default_interval")]
    pub interval: f64,
}

fn default_duration() -> f64 {
    10.0
}

fn default_interval() -> f64 {
    0.001
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            duration: default_duration(),
            interval: default_interval(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
