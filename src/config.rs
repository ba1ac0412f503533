//! Configuration
//!
//! Stored as JSON. Every field has a default, so a partial or missing file
//! still yields a usable config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

/// Settings for files written by the save pipeline and capture flow
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SaveSettings {
    /// Album (relative path) new photos are written to
    pub album: String,
    /// JPEG quality, 1..=100
    pub jpeg_quality: u8,
    /// Prefix of filtered copies, followed by a sortable timestamp
    pub edit_prefix: String,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            album: "Pictures/Lumify".to_string(),
            jpeg_quality: 90,
            edit_prefix: "LUMIFY_EDIT_".to_string(),
        }
    }
}

impl SaveSettings {
    /// Quality clamped to what the encoder accepts
    pub fn quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

/// Top-level configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding photo files
    pub library_root: PathBuf,
    /// SQLite catalog file
    pub database_path: PathBuf,
    pub save: SaveSettings,
}

impl Default for Config {
    /// Platform defaults:
    /// - Linux: ~/Pictures/Lumify and ~/.local/share/lumify/lumify.db
    /// - macOS: ~/Pictures/Lumify and ~/Library/Application Support/lumify/lumify.db
    /// - Windows: %USERPROFILE%\Pictures\Lumify and %APPDATA%\lumify\lumify.db
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        let mut library_root = dirs::picture_dir().unwrap_or_else(|| home.clone());
        library_root.push("Lumify");

        let mut database_path = dirs::data_dir().unwrap_or(home);
        database_path.push("lumify");
        database_path.push("lumify.db");

        Self {
            library_root,
            database_path,
            save: SaveSettings::default(),
        }
    }
}

impl Config {
    /// Default location of the config file, next to the database
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("lumify");
        path.push("config.json");
        path
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
