//! Configuration settings for Lectern.

use crate::api::DEFAULT_TIMEOUT_SECS;
use crate::error::{LecternError, Result};
use crate::query::{RetrievalParams, DEFAULT_VOICE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub backend: BackendSettings,
    pub ask: AskSettings,
    pub search: SearchSettings,
    pub player: PlayerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Directory that downloaded answers are saved to.
    pub download_dir: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            download_dir: "~/Downloads/lectern".to_string(),
        }
    }
}

/// Where the textbook backend lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendSettings {
    pub base_url: String,
    /// Per-request timeout. Answer synthesis with audio can take a while.
    pub timeout_seconds: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Defaults for asking questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AskSettings {
    pub default_voice: String,
    /// Ask the backend to speak the answer.
    pub generate_audio: bool,
    /// Excerpts retrieved for answer-only questions.
    pub top_k: u32,
    pub min_similarity: f32,
}

impl Default for AskSettings {
    fn default() -> Self {
        Self {
            default_voice: DEFAULT_VOICE.to_string(),
            generate_audio: true,
            top_k: RetrievalParams::ANSWER.top_k,
            min_similarity: RetrievalParams::ANSWER.min_similarity,
        }
    }
}

/// Defaults for plain search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub top_k: u32,
    pub min_similarity: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: RetrievalParams::SEARCH.top_k,
            min_similarity: RetrievalParams::SEARCH.min_similarity,
        }
    }
}

/// External programs used for playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerSettings {
    pub program: String,
    pub probe_program: String,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            program: "ffplay".to_string(),
            probe_program: "ffprobe".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values that would only fail later, at request time.
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(LecternError::Config("backend.base_url is empty".into()));
        }
        if self.backend.timeout_seconds == 0 {
            return Err(LecternError::Config("backend.timeout_seconds must be positive".into()));
        }
        for (section, top_k, min_similarity) in [
            ("ask", self.ask.top_k, self.ask.min_similarity),
            ("search", self.search.top_k, self.search.min_similarity),
        ] {
            if top_k == 0 {
                return Err(LecternError::Config(format!("{section}.top_k must be at least 1")));
            }
            if !(0.0..=1.0).contains(&min_similarity) {
                return Err(LecternError::Config(format!(
                    "{section}.min_similarity must be between 0 and 1"
                )));
            }
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| LecternError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lectern")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded download directory path.
    pub fn download_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.download_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds)
    }

    pub fn answer_params(&self) -> RetrievalParams {
        RetrievalParams {
            top_k: self.ask.top_k,
            min_similarity: self.ask.min_similarity,
        }
    }

    pub fn search_params(&self) -> RetrievalParams {
        RetrievalParams {
            top_k: self.search.top_k,
            min_similarity: self.search.min_similarity,
        }
    }

    /// Set a value by its dotted key, e.g. `backend.base_url`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .parse()
                .map_err(|_| LecternError::Config(format!("Invalid value for {key}: {value}")))
        }

        match key {
            "general.log_level" => self.general.log_level = value.to_string(),
            "general.download_dir" => self.general.download_dir = value.to_string(),
            "backend.base_url" => self.backend.base_url = value.to_string(),
            "backend.timeout_seconds" => self.backend.timeout_seconds = parse(key, value)?,
            "ask.default_voice" => self.ask.default_voice = value.to_string(),
            "ask.generate_audio" => self.ask.generate_audio = parse(key, value)?,
            "ask.top_k" => self.ask.top_k = parse(key, value)?,
            "ask.min_similarity" => self.ask.min_similarity = parse(key, value)?,
            "search.top_k" => self.search.top_k = parse(key, value)?,
            "search.min_similarity" => self.search.min_similarity = parse(key, value)?,
            "player.program" => self.player.program = value.to_string(),
            "player.probe_program" => self.player.probe_program = value.to_string(),
            _ => return Err(LecternError::Config(format!("Unknown config key: {key}"))),
        }
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [backend]
            base_url = "http://books.local:9000"

            [ask]
            default_voice = "en-GB-charles"
            "#,
        )
        .unwrap();

        assert_eq!(settings.backend.base_url, "http://books.local:9000");
        assert_eq!(settings.backend.timeout_seconds, 120);
        assert_eq!(settings.ask.default_voice, "en-GB-charles");
        assert!(settings.ask.generate_audio);
        assert_eq!(settings.search_params(), RetrievalParams::SEARCH);
        assert_eq!(settings.player.program, "ffplay");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.set("search.top_k", "8").unwrap();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.search.top_k, 8);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert_eq!(Settings::load_from(Some(&path)).unwrap(), Settings::default());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(settings.set("ask.top_k", "many").is_err());
        assert!(settings.set("ask.min_similarity", "1.5").is_err());
        assert!(settings.set("nope.key", "x").is_err());
        assert!(settings.set("backend.timeout_seconds", "0").is_err());
    }

    #[test]
    fn test_expand_path() {
        let path = Settings::expand_path("/tmp/lectern");
        assert_eq!(path, PathBuf::from("/tmp/lectern"));
    }
}
