//! XCT-Addon Core Library
//!
//! Reacts to XCTrack flight-computer events with configured actions: sound
//! playback, app launch, Telegram messages and push-to-talk broadcasts.
//!
//! # Example
//!
//! ```no_run
//! use xct_addon_core::{
//!     ActionRunner, BindingStore, CoreResult, Dispatcher, FlightEvent, LastKnownPosition,
//!     OpenLauncher, Player, Preferences, RodioOutput, SoundLibrary, SystemVolume,
//!     UdpBroadcastEmitter, init_database,
//! };
//!
//! use std::sync::Arc;
//!
//! # async fn run() -> CoreResult<()> {
//! let db = init_database("xct_addon.sqlite", 4).await?;
//! let store = BindingStore::new(&db);
//! store.ensure_default().await?;
//!
//! let player = Player::new(
//!     Arc::new(RodioOutput),
//!     SoundLibrary::new("Sounds", None),
//!     SystemVolume { current: 10, max: 15 },
//! );
//! let runner = ActionRunner::new(
//!     Arc::new(player),
//!     Arc::new(OpenLauncher),
//!     Arc::new(UdpBroadcastEmitter::new(
//!         "127.0.0.1:47811".parse().unwrap_or_else(|_| unreachable!()),
//!         "com.zello.ptt.up",
//!         true,
//!     )),
//!     Arc::new(LastKnownPosition::new()),
//!     Arc::new(Preferences::in_memory()),
//! );
//!
//! let dispatcher = Dispatcher::new(store, Arc::new(runner));
//! let outcome = dispatcher.dispatch(&FlightEvent::new("TAKEOFF")).await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

mod actions;
mod audio;
mod dispatcher;
mod error;
mod model;
mod preferences;
mod store;
pub mod telegram;

pub use {
    actions::{
        ActionRunner, AppLauncher, DEFAULT_PTT_ACTION, EXTRA_STAY_HIDDEN, LastKnownPosition,
        LocationProvider, OpenLauncher, Position, PttEmitter, UdpBroadcastEmitter,
    },
    audio::{
        AudioOutput, PlayOutcome, PlaybackEnd, PlaybackHandle, PlaybackReport, PlaybackRequest,
        PlaybackSlot, Player, RodioOutput, SoundLibrary,
    },
    dispatcher::{DispatchOutcome, Dispatcher, Reactor},
    error::{CoreError, Result as CoreResult},
    model::{
        ACTION_PREFIX, Action, ActionKind, Binding, BroadcastIntent, EXTRA_FORMAT_ARGS,
        EventCategory, FlightEvent, KNOWN_EVENTS, NewBinding, SystemVolume, VolumePolicy,
        is_known_event,
    },
    preferences::Preferences,
    store::{
        BindingStore, DEFAULT_SOUND_FILE, Database, IN_MEMORY, MessageStore, MessageTemplate,
        NewTask, SavedTask, TaskStore, init_database,
    },
    telegram::{BotInfo, ChatDirectory, TelegramChat, TelegramClient},
};

#[cfg(test)]
mod tests;
