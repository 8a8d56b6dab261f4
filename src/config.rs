use crate::constants::{DEFAULT_BLOCK_SIZE, DEFAULT_UNIQUE_EXTENSION};
use crate::core_file::TransferParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub base_directory: String,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default = "default_unique_extension")]
    pub unique_extension: String,
    #[serde(default)]
    pub delete_on_abort: bool,
    #[serde(default = "default_wildcard_support")]
    pub wildcard_support: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// File of `user:bcrypt_hash` lines.
    pub passwd_file: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub session: SessionConfig,
    pub auth: Option<AuthConfig>,
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

fn default_unique_extension() -> String {
    DEFAULT_UNIQUE_EXTENSION.to_string()
}

fn default_wildcard_support() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_directory: String::from("/var/rouillevfs"),
            block_size: default_block_size(),
            unique_extension: default_unique_extension(),
            delete_on_abort: false,
            wildcard_support: default_wildcard_support(),
        }
    }
}

impl SessionConfig {
    pub fn transfer_params(&self) -> TransferParams {
        TransferParams {
            block_size: self.block_size.max(1),
            delete_on_abort: self.delete_on_abort,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path))?;
        Self::from_toml(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        if config.session.block_size == 0 {
            anyhow::bail!("block_size must be greater than 0");
        }
        Ok(config)
    }
}
