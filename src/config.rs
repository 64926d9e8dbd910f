use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub tvdb: TvdbApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/metarr.db".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TvdbApiConfig {
    pub base_url: String,

    /// Base URL prefixed to stored banner/poster/image file names.
    pub banner_url: String,

    pub api_key: String,

    /// Optional account credentials. When a username is set it also
    /// selects which cached bearer token is used.
    pub username: Option<String>,

    pub password: Option<String>,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u32,
}

impl Default for TvdbApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.thetvdb.com/".to_string(),
            banner_url: "https://thetvdb.com/banners/".to_string(),
            api_key: String::new(),
            username: None,
            password: None,
            request_timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tvdb.api_key.is_empty() {
            anyhow::bail!("tvdb.api_key is not set; add it to config.toml");
        }
        if self.tvdb.password.is_some() && self.tvdb.username.is_none() {
            anyhow::bail!("tvdb.password is set without tvdb.username");
        }
        Ok(())
    }

    pub fn create_default_if_missing() -> Result<PathBuf> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            return Ok(path);
        }

        let content = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("metarr").join("config.toml"));
        }

        paths
    }
}
