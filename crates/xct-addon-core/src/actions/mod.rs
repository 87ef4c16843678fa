//! Executors for the non-audio actions and the runner that routes to them.

mod launcher;
mod location;
mod ptt;
mod runner;

pub use {
    launcher::{AppLauncher, OpenLauncher},
    location::{LastKnownPosition, LocationProvider, Position},
    ptt::{DEFAULT_PTT_ACTION, EXTRA_STAY_HIDDEN, PttEmitter, UdpBroadcastEmitter},
    runner::ActionRunner,
};
