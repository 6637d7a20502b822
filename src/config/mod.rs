//! Configuration management for Flashdeck

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::progress::{Rules, StreakTrigger};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Point, XP, streak and challenge constants
    pub rules: Rules,

    /// Subjects and topics available for study
    pub catalog: Catalog,

    /// Which activity extends the daily streak
    pub streak_trigger: StreakTrigger,

    /// Number of entries shown on the leaderboard
    pub leaderboard_size: usize,

    /// Overrides the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules: Rules::default(),
            catalog: Catalog::default(),
            streak_trigger: StreakTrigger::default(),
            leaderboard_size: 10,
            data_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from disk, or create default if not exists
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, creating it if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            serde_json::from_str(&contents).with_context(|| "Failed to parse config.json")
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Created default config at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "flashdeck")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Get the platform data directory path
    pub fn default_data_dir() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "flashdeck").context("Failed to determine data directory")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Get the data directory in effect, honouring the override
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_data_dir(),
        }
    }

    /// Get the directory holding per-user progress files
    pub fn progress_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("progress"))
    }

    /// Get the path of the saved-cards file
    pub fn saved_cards_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("saved.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_uses_session_start_streaks() {
        let config = Config::default();
        assert_eq!(config.streak_trigger, StreakTrigger::SessionStart);
        assert_eq!(config.leaderboard_size, 10);
    }

    #[test]
    fn config_serializes_to_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("mechanics"));
        assert!(!json.contains("data_dir"));
    }

    #[test]
    fn config_deserializes_partial_json() {
        let json = r#"{"streak_trigger":"card_completion","rules":{"daily_target":5}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.streak_trigger, StreakTrigger::CardCompletion);
        assert_eq!(config.rules.daily_target, 5);
        assert_eq!(config.rules.card_points, 10);
        assert_eq!(config.catalog, Catalog::default());
    }

    #[test]
    fn load_from_creates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config, Config::default());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn data_dir_override_wins() {
        let config = Config { data_dir: Some(PathBuf::from("/tmp/deck")), ..Config::default() };
        assert_eq!(config.progress_dir().unwrap(), PathBuf::from("/tmp/deck/progress"));
        assert_eq!(config.saved_cards_path().unwrap(), PathBuf::from("/tmp/deck/saved.json"));
    }
}
