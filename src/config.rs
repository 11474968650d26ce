//! Configuration loaded from `~/.config/rucap/config.toml`.
//!
//! ```toml
//! model = "gemini-2.5-flash"
//! frame_rate = 60
//! style = "karaoke"
//!
//! [appearance]
//! color = "#FFFFFF"
//! font_family = "'Noto Nastaliq Urdu', serif"
//! animation_speed = 1.5
//! ```
//!
//! The API key comes from `GEMINI_API_KEY` or `API_KEY` when set, otherwise
//! from `api_key` in the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::SourceError;
use crate::playback::DEFAULT_FRAME_RATE;
use crate::source::{GeminiSource, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::style::{AnimationStyle, CosmeticSettings};

/// Environment variables checked for the API key, in order.
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub api_key: Option<String>,
    pub api_base: String,
    /// Tick loop rate in Hz.
    pub frame_rate: f64,
    pub style: AnimationStyle,
    pub appearance: CosmeticSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            frame_rate: DEFAULT_FRAME_RATE,
            style: AnimationStyle::default(),
            appearance: CosmeticSettings::default(),
        }
    }
}

impl Config {
    /// Parse a config document.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// API key from the environment, falling back to the file.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.resolve_api_key(|name| std::env::var(name).ok())
    }

    fn resolve_api_key(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        API_KEY_VARS
            .iter()
            .find_map(|name| lookup(name))
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    /// Gemini source configured from this file.
    pub fn gemini_source(&self) -> Result<GeminiSource, SourceError> {
        let key = self.api_key().ok_or(SourceError::MissingApiKey)?;
        Ok(GeminiSource::new(key)?
            .with_model(&self.model)
            .with_api_base(&self.api_base))
    }
}

/// Load configuration.
///
/// With `path` set the file must exist. Without it, the default location is
/// used and a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (config_path(), false),
    };
    if !required && !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    Config::from_toml(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

/// Default config file location.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rucap")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextAlign;

    #[test]
    fn parse_empty_config() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn parse_partial_appearance() {
        let config = Config::from_toml(
            r##"
style = "bubble-pop"
frame_rate = 30

[appearance]
color = "#FFFF00"
text_align = "left"
show_bg = false
"##,
        )
        .unwrap();
        assert_eq!(config.style, AnimationStyle::BubblePop);
        assert!((config.frame_rate - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.appearance.color, "#FFFF00");
        assert_eq!(config.appearance.text_align, TextAlign::Left);
        assert!(!config.appearance.show_bg);
        assert!(config.appearance.bold);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn rejects_unknown_style() {
        assert!(Config::from_toml(r#"style = "sparkle""#).is_err());
    }

    #[test]
    fn environment_key_wins() {
        let config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        let key = config.resolve_api_key(|name| (name == "API_KEY").then(|| "from-env".to_string()));
        assert_eq!(key.as_deref(), Some("from-env"));

        let key = config.resolve_api_key(|_| None);
        assert_eq!(key.as_deref(), Some("from-file"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config = Config {
            api_key: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(config.resolve_api_key(|_| None).is_none());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/rucap/config.toml"))).is_err());
    }

    #[test]
    fn loads_file_from_path() {
        let path = std::env::temp_dir().join(format!("rucap-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "model = \"gemini-test\"\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.model, "gemini-test");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn config_path_ends_with_rucap() {
        assert!(config_path().ends_with("rucap/config.toml"));
    }
}
