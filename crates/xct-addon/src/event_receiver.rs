//! Inbound flight-event receiver.
//!
//! Listens for XCTrack broadcasts delivered as JSON datagrams, keeps only the
//! registered events and forwards them to the application loop.

use crate::{AppCommand, AppError, AppResult};

use xct_addon_core::{BroadcastIntent, FlightEvent};

use std::{net::SocketAddr, panic::Location};

use error_location::ErrorLocation;
use tokio::{
    net::UdpSocket,
    sync::{mpsc, watch},
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Largest datagram accepted.
const MAX_DATAGRAM: usize = 64 * 1024;

/// UDP listener turning broadcasts into [`AppCommand::HandleEvent`].
pub struct EventReceiver {
    socket: UdpSocket,
    command_tx: mpsc::Sender<AppCommand>,
}

impl EventReceiver {
    /// Bind the receiving socket.
    #[instrument(skip(command_tx))]
    pub async fn bind(bind_address: &str, command_tx: mpsc::Sender<AppCommand>) -> AppResult<Self> {
        let socket = UdpSocket::bind(bind_address)
            .await
            .map_err(|e| AppError::Server {
                reason: format!("Failed to bind event receiver on {}: {}", bind_address, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(address = %socket.local_addr()?, "Event receiver listening");

        Ok(Self { socket, command_tx })
    }

    /// Address the receiver is bound to.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive until shutdown is signalled or the application loop is gone.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Event receiver shutting down");
                    break;
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = match received {
                        Ok(r) => r,
                        Err(e) => {
                            warn!(error = ?e, "Failed to receive datagram");
                            continue;
                        }
                    };

                    let Some(event) = decode_datagram(&buf[..len]) else {
                        continue;
                    };

                    let session_id = Uuid::new_v4();
                    info!(event = %event.name, %peer, session_id = %session_id, "Event received");

                    self.command_tx
                        .send(AppCommand::HandleEvent { event, session_id })
                        .await
                        .map_err(|e| AppError::ChannelSendFailed {
                            message: format!("Failed to send HandleEvent: {}", e),
                            location: ErrorLocation::from(Location::caller()),
                        })?;
                }
            }
        }

        Ok(())
    }
}

/// Decode one datagram. Malformed payloads and unregistered events yield
/// `None` and are logged.
pub(crate) fn decode_datagram(payload: &[u8]) -> Option<FlightEvent> {
    let intent: BroadcastIntent = match serde_json::from_slice(payload) {
        Ok(intent) => intent,
        Err(e) => {
            warn!(error = %e, len = payload.len(), "Dropping malformed broadcast");
            return None;
        }
    };

    let event = FlightEvent::from_intent(&intent);
    if event.is_none() {
        debug!(action = %intent.action, "Ignoring unregistered broadcast");
    }
    event
}
