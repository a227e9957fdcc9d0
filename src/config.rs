use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable consulted before the config file for the API key.
pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub default_model: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save()
    }

    /// API key resolution order: process environment, then the config file.
    /// `None` when neither is set; the chat client surfaces that in-session.
    pub fn resolve_api_key(&self) -> Option<String> {
        env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.api_key.clone())
    }

    pub fn log_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("bailian.log"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("bailian"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bailian").join("config.json");

        let config = Config {
            api_key: Some("sk-test".to_string()),
            default_model: Some("qwen-max".to_string()),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("sk-test"));
        assert_eq!(loaded.default_model.as_deref(), Some("qwen-max"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(loaded.api_key.is_none());
        assert!(loaded.default_model.is_none());
    }

    #[test]
    fn api_key_prefers_environment() {
        let config = Config {
            api_key: Some("from-file".to_string()),
            default_model: None,
        };

        env::set_var(API_KEY_ENV, "from-env");
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-env"));

        env::set_var(API_KEY_ENV, "");
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-file"));

        env::remove_var(API_KEY_ENV);
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-file"));
        assert_eq!(Config::new().resolve_api_key(), None);
    }
}
