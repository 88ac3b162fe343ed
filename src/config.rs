//! User configuration and preferences

use crate::copier::{ConflictPolicy, DEFAULT_QUEUE_CAPACITY};
use crate::error::{Result, ShortlistError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Whether the welcome dialog has been shown
    pub welcome_shown: bool,
    pub conflict_policy: ConflictPolicy,
    pub copy_queue_capacity: usize,
    /// Decode the next image in the background
    pub prefetch: bool,
    /// How long to wait for pending copies on exit
    pub exit_wait_secs: u64,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            welcome_shown: false,
            conflict_policy: ConflictPolicy::Rename,
            copy_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            prefetch: true,
            exit_wait_secs: 10,
        }
    }
}

impl UserConfig {
    /// Get the config file path (~/.config/shortlist/config.json)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("shortlist").join("config.json"))
    }

    /// Load config from the default location, or defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path().ok_or_else(|| {
            ShortlistError::ConfigError("Could not determine config directory".to_string())
        })?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            ShortlistError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            ShortlistError::ConfigError(format!("Failed to parse config file: {}", e))
        })
    }

    /// Like [`load`](Self::load), falling back to defaults with a warning
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("{}; using defaults", e);
            Self::default()
        })
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or_else(|| {
            ShortlistError::ConfigError("Could not determine config directory".to_string())
        })?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ShortlistError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            ShortlistError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, contents).map_err(|e| {
            ShortlistError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }
}
