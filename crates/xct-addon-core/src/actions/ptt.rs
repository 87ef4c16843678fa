//! Push-to-talk broadcast emission.
//!
//! The PTT app listens for a named broadcast; here a broadcast is a JSON
//! [`BroadcastIntent`] datagram sent to the configured address.

use crate::{CoreError, CoreResult, model::BroadcastIntent};

use std::{
    net::{SocketAddr, UdpSocket},
    panic::Location,
};

use error_location::ErrorLocation;
use tracing::info;

/// Default PTT action name.
pub const DEFAULT_PTT_ACTION: &str = "com.zello.ptt.up";

/// Extra asking the PTT app to stay in the background.
pub const EXTRA_STAY_HIDDEN: &str = "com.zello.stayHidden";

/// Emits the push-to-talk broadcast.
pub trait PttEmitter: Send + Sync + 'static {
    /// Send one PTT broadcast.
    fn emit(&self) -> CoreResult<()>;
}

/// [`PttEmitter`] sending JSON datagrams over UDP.
#[derive(Debug, Clone)]
pub struct UdpBroadcastEmitter {
    target: SocketAddr,
    action: String,
    stay_hidden: bool,
}

impl UdpBroadcastEmitter {
    /// Emitter targeting `target` with the given action name.
    pub fn new(target: SocketAddr, action: impl Into<String>, stay_hidden: bool) -> Self {
        Self {
            target,
            action: action.into(),
            stay_hidden,
        }
    }

    /// The broadcast this emitter sends.
    pub fn intent(&self) -> BroadcastIntent {
        BroadcastIntent::new(self.action.clone()).with_extra(EXTRA_STAY_HIDDEN, self.stay_hidden)
    }
}

impl PttEmitter for UdpBroadcastEmitter {
    #[track_caller]
    fn emit(&self) -> CoreResult<()> {
        let payload = serde_json::to_vec(&self.intent()).map_err(|e| CoreError::Broadcast {
            reason: format!("Failed to encode broadcast: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let bind_addr: SocketAddr = if self.target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(bind_addr).map_err(|e| CoreError::Broadcast {
            reason: format!("Failed to bind socket: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        socket
            .send_to(&payload, self.target)
            .map_err(|e| CoreError::Broadcast {
                reason: format!("Failed to send to {}: {}", self.target, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(action = %self.action, target = %self.target, "PTT broadcast sent");
        Ok(())
    }
}
