//! Configuration management for xct-addon.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths and atomic write operations. Missing sections and keys fall back
//! to their defaults.

use crate::{
    AppError, AppResult,
    config::{
        APPLICATION, AudioConfig, ORGANIZATION, PttConfig, QUALIFIER, ReceiverConfig,
        ServerConfig, StorageConfig, TelegramConfig, data_dir,
    },
};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const CONFIG_FILE: &str = "config.toml";
const PREFERENCES_FILE: &str = "preferences.toml";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Binding database.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Inbound broadcast receiver.
    #[serde(default)]
    pub receiver: ReceiverConfig,
    /// Sound playback.
    #[serde(default)]
    pub audio: AudioConfig,
    /// Push-to-talk broadcast.
    #[serde(default)]
    pub ptt: PttConfig,
    /// Telegram bot.
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Settings HTTP server.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from the user config directory, creating a default
    /// file if none exists.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE);
        Self::load_from(&config_path)
    }

    /// Load configuration from `config_path`, writing defaults there if the
    /// file does not exist.
    #[track_caller]
    pub fn load_from(config_path: &Path) -> AppResult<Self> {
        if !config_path.exists() {
            info!(config_path = ?config_path, "No config found, creating default");
            let config = Config::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration loaded");

        Ok(config)
    }

    /// Save configuration to the user config directory.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE);
        self.save_to(&config_path)
    }

    /// Save configuration to `config_path` using the atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Location of the preferences file next to the config file.
    #[track_caller]
    pub fn preferences_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join(PREFERENCES_FILE))
    }

    /// Directory for rolling log files.
    pub fn log_dir() -> PathBuf {
        data_dir().join("logs")
    }

    /// Get the settings server URL.
    pub fn server_url(&self) -> String {
        format!("http://localhost:{}", self.server.port)
    }

    #[track_caller]
    fn config_dir() -> AppResult<PathBuf> {
        let proj_dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get config directory".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.to_path_buf())
    }
}
