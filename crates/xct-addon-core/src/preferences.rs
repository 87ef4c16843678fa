//! Small persisted key-value settings: pilot name, Telegram user id,
//! validation flag and the cached chat list.

use crate::{CoreError, CoreResult, telegram::TelegramChat};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard},
};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct PreferenceData {
    pilot_name: Option<String>,
    user_id: Option<String>,
    telegram_validated: bool,
    cached_chats: Vec<TelegramChat>,
}

/// Preference store backed by a TOML file, or memory only.
#[derive(Debug)]
pub struct Preferences {
    path: Option<PathBuf>,
    data: RwLock<PreferenceData>,
}

impl Preferences {
    /// Load from `path`. A missing or unreadable file yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Preferences file is corrupt, using defaults");
                PreferenceData::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preferences file, using defaults");
                PreferenceData::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read preferences, using defaults");
                PreferenceData::default()
            }
        };

        Self {
            path: Some(path),
            data: RwLock::new(data),
        }
    }

    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(PreferenceData::default()),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Pilot name used to prefix Telegram messages.
    pub fn pilot_name(&self) -> Option<String> {
        self.read().pilot_name.clone()
    }

    /// Set or clear the pilot name. Blank names clear it.
    pub fn set_pilot_name(&self, name: Option<&str>) -> CoreResult<()> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        self.modify(|d| d.pilot_name = name.map(str::to_string))
    }

    /// Telegram user id of the pilot.
    pub fn user_id(&self) -> Option<String> {
        self.read().user_id.clone()
    }

    /// Set or clear the Telegram user id.
    pub fn set_user_id(&self, user_id: Option<&str>) -> CoreResult<()> {
        self.modify(|d| d.user_id = user_id.map(str::to_string))
    }

    /// Whether the bot token was validated.
    pub fn telegram_validated(&self) -> bool {
        self.read().telegram_validated
    }

    /// Record the bot validation result.
    pub fn set_telegram_validated(&self, validated: bool) -> CoreResult<()> {
        self.modify(|d| d.telegram_validated = validated)
    }

    /// Last known chat list.
    pub fn cached_chats(&self) -> Vec<TelegramChat> {
        self.read().cached_chats.clone()
    }

    /// Replace the cached chat list.
    pub fn set_cached_chats(&self, chats: Vec<TelegramChat>) -> CoreResult<()> {
        self.modify(|d| d.cached_chats = chats)
    }

    /// Forget the Telegram identity, validation and chat cache. The pilot
    /// name is kept.
    pub fn clear_telegram(&self) -> CoreResult<()> {
        self.modify(|d| {
            d.user_id = None;
            d.telegram_validated = false;
            d.cached_chats.clear();
        })
    }

    /// Reset everything to defaults.
    pub fn clear(&self) -> CoreResult<()> {
        self.modify(|d| *d = PreferenceData::default())
    }

    fn read(&self) -> RwLockReadGuard<'_, PreferenceData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `change` and persist it. The write lock is held until the file
    /// is renamed into place, so saves never interleave and memory only
    /// changes once the file does.
    #[track_caller]
    fn modify(&self, change: impl FnOnce(&mut PreferenceData)) -> CoreResult<()> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        let mut updated = data.clone();
        change(&mut updated);

        if let Some(path) = &self.path {
            save_atomic(path, &updated)?;
        }

        *data = updated;
        Ok(())
    }
}

#[track_caller]
fn save_atomic(path: &Path, data: &PreferenceData) -> CoreResult<()> {
    let contents = toml::to_string_pretty(data).map_err(|e| CoreError::Preferences {
        reason: format!("Failed to serialize preferences: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;

    debug!(path = %path.display(), "Preferences saved");
    Ok(())
}
