use crate::config::{default_ptt_action, default_ptt_target, default_stay_hidden};

use serde::{Deserialize, Serialize};

/// Push-to-talk broadcast configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PttConfig {
    /// UDP address the PTT app listens on.
    #[serde(default = "default_ptt_target")]
    pub target_address: String,
    /// Broadcast action name.
    #[serde(default = "default_ptt_action")]
    pub action: String,
    /// Ask the PTT app to stay in the background.
    #[serde(default = "default_stay_hidden")]
    pub stay_hidden: bool,
}

impl Default for PttConfig {
    fn default() -> Self {
        Self {
            target_address: default_ptt_target(),
            action: default_ptt_action(),
            stay_hidden: default_stay_hidden(),
        }
    }
}
