use crate::{CoreError, CoreResult};

use std::panic::Location;

use error_location::ErrorLocation;
use tracing::info;

/// Starts another installed application by identifier.
pub trait AppLauncher: Send + Sync + 'static {
    /// Launch `target`.
    fn launch(&self, target: &str) -> CoreResult<()>;
}

/// Launches through the platform opener (`xdg-open`, `open`, `start`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenLauncher;

impl AppLauncher for OpenLauncher {
    #[track_caller]
    fn launch(&self, target: &str) -> CoreResult<()> {
        open::that_detached(target).map_err(|e| CoreError::Launch {
            target: target.to_string(),
            reason: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(target, "Application launched");
        Ok(())
    }
}
