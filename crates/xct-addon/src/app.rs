use crate::{AppCommand, AppResult};

use xct_addon_core::{ActionRunner, DispatchOutcome, Dispatcher};

use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
};
use tracing::{debug, error, info, instrument, warn};

/// How long in-flight dispatches may run after shutdown is requested.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Main application state.
///
/// Owns the command channel. Each inbound event is dispatched on its own
/// task so a slow action never delays the next event.
pub struct App {
    pub(crate) dispatcher: Dispatcher<ActionRunner>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl App {
    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("XCT-Addon starting");

        let mut dispatches = JoinSet::new();

        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AppCommand::HandleEvent { event, session_id } => {
                            let dispatcher = self.dispatcher.clone();
                            dispatches.spawn(async move {
                                match dispatcher.dispatch(&event).await {
                                    Ok(DispatchOutcome::Unbound) => {
                                        debug!(session_id = %session_id, event = %event.name, "Event not bound");
                                    }
                                    Ok(outcome) => {
                                        info!(session_id = %session_id, event = %event.name, ?outcome, "Event dispatched");
                                    }
                                    Err(e) => {
                                        error!(session_id = %session_id, event = %event.name, error = ?e, "Dispatch failed");
                                    }
                                }
                            });
                        }
                        AppCommand::Shutdown => {
                            info!("Shutdown requested");
                            break;
                        }
                    }
                }

                Some(joined) = dispatches.join_next(), if !dispatches.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = ?e, "Dispatch task panicked");
                    }
                }

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        let _ = self.shutdown_tx.send(true);

        let drain = async {
            while let Some(joined) = dispatches.join_next().await {
                if let Err(e) = joined {
                    error!(error = ?e, "Dispatch task panicked");
                }
            }
        };
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("In-flight dispatches did not finish within timeout, aborting");
        }

        info!("XCT-Addon shut down successfully");

        Ok(())
    }
}
