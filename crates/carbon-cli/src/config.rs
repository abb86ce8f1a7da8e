//! Application configuration management.
//!
//! Configuration is stored at `~/.config/carbon/config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "carbon";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Server used when neither the config nor `CARBON_URL` name one
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    pub storage_key: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Server URL: `override_url` (from `CARBON_URL` or `--url`), then the
    /// config file, then the built-in default.
    pub fn base_url(&self, override_url: Option<&str>) -> String {
        override_url
            .or(self.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string()
    }

    pub fn storage_key(&self) -> &str {
        self.storage_key
            .as_deref()
            .unwrap_or(carbon_core::storage::DEFAULT_KEY)
    }
}
