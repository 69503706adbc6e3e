//! Configuration file loading.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::{HarpoonError, Result};
use crate::rules::RuleTable;

pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `"<event>:<owner/repo>:<ref|all>"` to the command it triggers.
    #[serde(default)]
    pub events: RuleTable,
    #[serde(default)]
    pub tunnel: bool,
    #[serde(default, alias = "tunnelname")]
    pub tunnel_name: String,
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9001
}

impl Config {
    /// Loads TOML, or YAML when the extension is `.yaml`/`.yml`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );

        let config: Config = if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        Ok(config)
    }

    /// Tries `requested` first and falls back to [`DEFAULT_CONFIG_PATH`].
    pub fn load(requested: Option<&Path>) -> Result<(Self, PathBuf)> {
        Self::load_from(requested, Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Tries `requested` first and falls back to `default`. A path is never
    /// tried twice.
    pub fn load_from(requested: Option<&Path>, default: &Path) -> Result<(Self, PathBuf)> {
        let mut candidates = vec![];
        if let Some(requested) = requested {
            candidates.push(requested.to_path_buf());
        }
        if !candidates.iter().any(|c| c == default) {
            candidates.push(default.to_path_buf());
        }

        for path in &candidates {
            match Self::from_file(path) {
                Ok(config) => return Ok((config, path.clone())),
                Err(e) => tracing::warn!("{e:#}"),
            }
        }

        let tried = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(HarpoonError::ConfigUnavailable(tried).into())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}
