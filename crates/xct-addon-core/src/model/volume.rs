use serde::{Deserialize, Serialize};

/// Snapshot of the system media stream volume, in device steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemVolume {
    /// Current volume step.
    pub current: u32,
    /// Highest volume step of the stream.
    pub max: u32,
}

/// Rule determining playback loudness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "percent", rename_all = "snake_case")]
pub enum VolumePolicy {
    /// Always full volume.
    Maximum,
    /// Mirror the current system stream volume.
    System,
    /// Fixed percentage, 0–100.
    Percentage(u8),
}

impl VolumePolicy {
    /// Resolve to a gain in `[0.0, 1.0]`.
    pub fn resolve(&self, system: SystemVolume) -> f32 {
        let gain = match *self {
            VolumePolicy::Maximum => 1.0,
            VolumePolicy::System => {
                if system.max == 0 {
                    1.0
                } else {
                    system.current as f32 / system.max as f32
                }
            }
            VolumePolicy::Percentage(percent) => f32::from(percent.min(100)) / 100.0,
        };

        gain.clamp(0.0, 1.0)
    }

    /// Name stored in the `volume_type` column.
    pub(crate) fn column_name(&self) -> &'static str {
        match self {
            VolumePolicy::Maximum => "MAXIMUM",
            VolumePolicy::System => "SYSTEM",
            VolumePolicy::Percentage(_) => "PERCENTAGE",
        }
    }

    /// Percentage stored alongside the type; 100 for non-percentage policies.
    pub(crate) fn column_percentage(&self) -> i64 {
        match self {
            VolumePolicy::Percentage(p) => i64::from(*p),
            _ => 100,
        }
    }

    /// Rebuild from stored columns. Unknown types fall back to `System`.
    pub(crate) fn from_columns(volume_type: &str, percentage: i64) -> Self {
        match volume_type {
            "MAXIMUM" => VolumePolicy::Maximum,
            "PERCENTAGE" => VolumePolicy::Percentage(percentage.clamp(0, 100) as u8),
            _ => VolumePolicy::System,
        }
    }
}
