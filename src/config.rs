use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::review::history::HistoryMode;

pub const TOKEN_ENV: &str = "REREADR_TOKEN";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
    #[serde(default)]
    pub history_mode: HistoryMode,
    #[serde(default = "default_history_prefetch_rows")]
    pub history_prefetch_rows: usize,
    #[serde(default = "default_page_window")]
    pub page_window: u32,
    #[serde(default = "default_toast_secs")]
    pub toast_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_locale() -> String {
    "ko".to_string()
}
fn default_history_page_size() -> u32 {
    10
}
fn default_history_prefetch_rows() -> usize {
    3
}
fn default_page_window() -> u32 {
    5
}
fn default_toast_secs() -> u64 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            theme: default_theme(),
            locale: default_locale(),
            history_page_size: default_history_page_size(),
            history_mode: HistoryMode::default(),
            history_prefetch_rows: default_history_prefetch_rows(),
            page_window: default_page_window(),
            toast_secs: default_toast_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };
        config.normalize();
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rereadr")
            .join("config.toml")
    }

    pub fn log_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rereadr")
            .join("rereadr.log")
    }

    /// Token from the environment wins over the file.
    pub fn token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.api_token.clone())
    }

    /// Clamp values an edited file may have broken.
    pub fn normalize(&mut self) {
        self.history_page_size = self.history_page_size.clamp(1, 100);
        self.page_window = self.page_window.clamp(1, 15);
        if !matches!(self.locale.as_str(), "en" | "ko") {
            self.locale = default_locale();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.history_page_size, 10);
        assert_eq!(config.history_mode, HistoryMode::Paged);
        assert_eq!(config.locale, "ko");
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_config_partial_file() {
        let toml_str = r#"
api_url = "https://books.example.org"
history_mode = "infinite"
page_window = 7
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_url, "https://books.example.org");
        assert_eq!(config.history_mode, HistoryMode::Infinite);
        assert_eq!(config.page_window, 7);
        assert_eq!(config.toast_secs, 3);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.history_mode = HistoryMode::Infinite;
        config.locale = "en".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.history_mode, HistoryMode::Infinite);
        assert_eq!(loaded.locale, "en");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.history_page_size, 10);
    }

    #[test]
    fn test_normalize_clamps_and_resets_locale() {
        let mut config = Config {
            history_page_size: 0,
            page_window: 99,
            locale: "fr".to_string(),
            ..Config::default()
        };
        config.normalize();
        assert_eq!(config.history_page_size, 1);
        assert_eq!(config.page_window, 15);
        assert_eq!(config.locale, "ko");
    }
}
