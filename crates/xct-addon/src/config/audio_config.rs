use crate::config::{default_sounds_dir, default_system_volume};

use xct_addon_core::SystemVolume;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Sound playback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Directory with user sound files.
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: PathBuf,
    /// Fallback directory with bundled sounds.
    #[serde(default)]
    pub bundled_sounds_dir: Option<PathBuf>,
    /// Media stream volume mirrored by the `system` volume policy.
    #[serde(default = "default_system_volume")]
    pub system_volume: SystemVolumeConfig,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sounds_dir: default_sounds_dir(),
            bundled_sounds_dir: None,
            system_volume: default_system_volume(),
        }
    }
}

/// Current and maximum media volume steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SystemVolumeConfig {
    /// Current step.
    pub current: u32,
    /// Highest step.
    pub max: u32,
}

impl From<SystemVolumeConfig> for SystemVolume {
    fn from(config: SystemVolumeConfig) -> Self {
        SystemVolume {
            current: config.current,
            max: config.max,
        }
    }
}
