//! Configuration loading for the trialmatch binary.
//! Reads trialmatch.toml from the path in TRIALMATCH_CONFIG or the current directory.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use trialmatch_common::MatchConfig;

pub const CONFIG_ENV: &str = "TRIALMATCH_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "trialmatch.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// `[registry]`, `[search]`, `[ranking]` and `[knowledge]` tables.
    #[serde(flatten)]
    pub matching: MatchConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_pretty")]
    pub pretty: bool,
    /// Write the report here instead of stdout.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_pretty() -> bool { true }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: default_pretty(), path: None }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit TRIALMATCH_CONFIG path must exist. Without one, a missing
    /// trialmatch.toml falls back to the defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load_from(&path),
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load_from(DEFAULT_CONFIG_FILE),
            Err(_) => {
                tracing::warn!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.matching.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests;
