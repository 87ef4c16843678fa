mod binding;
mod event;
mod volume;

pub(crate) use binding::ActionColumns;

pub use {
    binding::{Action, ActionKind, Binding, NewBinding},
    event::{
        ACTION_PREFIX, BroadcastIntent, EXTRA_FORMAT_ARGS, EventCategory, FlightEvent,
        KNOWN_EVENTS, is_known_event,
    },
    volume::{SystemVolume, VolumePolicy},
};
