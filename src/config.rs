//! Application configuration
//!
//! A small read-write JSON document in the user's home directory. Missing
//! keys are back-filled from defaults and unknown keys are ignored, so the
//! file survives upgrades in both directions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SharedChatError};

/// Config file name under the user's home directory
pub const CONFIG_FILE_NAME: &str = ".sharedchat_config.json";

/// Default periodic import interval in milliseconds (30 seconds)
const DEFAULT_AUTO_IMPORT_INTERVAL_MS: u64 = 30_000;

fn default_auto_import_interval() -> u64 {
    DEFAULT_AUTO_IMPORT_INTERVAL_MS
}

/// Application configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory scanned by batch and periodic imports
    #[serde(default)]
    pub download_directory: String,
    /// Whether the periodic import timer should run
    #[serde(default)]
    pub auto_import: bool,
    /// Whether imports are followed by an AI title-suggestion pass
    #[serde(default)]
    pub enable_ai_rename: bool,
    /// Periodic import interval in milliseconds
    #[serde(default = "default_auto_import_interval")]
    pub auto_import_interval: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_directory: String::new(),
            auto_import: false,
            enable_ai_rename: false,
            auto_import_interval: DEFAULT_AUTO_IMPORT_INTERVAL_MS,
        }
    }
}

impl AppConfig {
    /// Default location of the config file: `~/.sharedchat_config.json`
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SharedChatError::InvalidConfig("home directory not found".into()))?;
        Ok(home.join(CONFIG_FILE_NAME))
    }

    /// Load the configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from `path`.
    ///
    /// A missing file is created with defaults. A file that fails to parse is
    /// reset to defaults rather than blocking startup.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(path)?;
        match serde_json::from_str::<Self>(&raw) {
            Ok(config) => {
                config.validate()?;
                Ok(config)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config file malformed, resetting to defaults");
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
        }
    }

    /// Save the configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Save the configuration to `path` as pretty-printed JSON
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.auto_import_interval == 0 {
            return Err(SharedChatError::InvalidConfig(
                "auto_import_interval must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// The configured download directory, if set and existing
    #[must_use]
    pub fn import_directory(&self) -> Option<PathBuf> {
        if self.download_directory.is_empty() {
            return None;
        }
        let dir = PathBuf::from(&self.download_directory);
        dir.is_dir().then_some(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.download_directory, "");
        assert!(!config.auto_import);
        assert!(!config.enable_ai_rename);
        assert_eq!(config.auto_import_interval, 30_000);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_interval() {
        let config = AppConfig {
            auto_import_interval: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
