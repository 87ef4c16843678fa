use crate::{CoreError, CoreResult};

use std::{
    panic::Location,
    sync::{Arc, RwLock},
};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// A WGS84 position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// Source of the pilot's current position.
pub trait LocationProvider: Send + Sync + 'static {
    /// Current position, or `LocationUnavailable`.
    fn current(&self) -> CoreResult<Position>;

    /// Offer a position seen in an inbound event.
    fn record(&self, _position: Position) {}
}

/// Most recent position reported by inbound events.
#[derive(Debug, Clone, Default)]
pub struct LastKnownPosition {
    inner: Arc<RwLock<Option<Position>>>,
}

impl LastKnownPosition {
    /// Empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new fix.
    pub fn update(&self, latitude: f64, longitude: f64) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Position {
            latitude,
            longitude,
        });
    }
}

impl LocationProvider for LastKnownPosition {
    #[track_caller]
    fn current(&self) -> CoreResult<Position> {
        let slot = self.inner.read().unwrap_or_else(|e| e.into_inner());
        (*slot).ok_or_else(|| CoreError::LocationUnavailable {
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn record(&self, position: Position) {
        self.update(position.latitude, position.longitude);
    }
}
