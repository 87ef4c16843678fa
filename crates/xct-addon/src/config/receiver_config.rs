use crate::config::default_bind_address;

use serde::{Deserialize, Serialize};

/// Inbound broadcast receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// UDP address XCTrack broadcasts are delivered to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}
