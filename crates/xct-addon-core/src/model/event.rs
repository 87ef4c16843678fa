//! XCTrack event catalog and broadcast decoding.
//!
//! XCTrack announces in-flight events as broadcasts whose action is
//! `org.xcontest.XCTrack.Event.<NAME>`, optionally carrying a `formatArgs`
//! extra. Only the events listed in [`KNOWN_EVENTS`] are registered for.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix shared by every XCTrack event broadcast action.
pub const ACTION_PREFIX: &str = "org.xcontest.XCTrack.Event.";

/// Extra key holding the event's format arguments.
pub const EXTRA_FORMAT_ARGS: &str = "formatArgs";

/// Every event the agent registers for, in catalog order.
pub const KNOWN_EVENTS: [&str; 31] = [
    "TAKEOFF",
    "LANDING",
    "BATTERY50",
    "BATTERY40",
    "BATTERY30",
    "BATTERY20",
    "BATTERY10",
    "BATTERY5",
    "BATTERY_CHARGING",
    "BATTERY_DISCHARGING",
    "START_THERMALING",
    "STOP_THERMALING",
    "COMP_SSS_CROSSED",
    "COMP_TURNPOINT_CROSSED",
    "COMP_ESS_CROSSED",
    "COMP_GOAL_CROSSED",
    "SYSTEM_GPS_OK",
    "AIRSPACE_CROSSED",
    "AIRSPACE_RED_WARN",
    "AIRSPACE_ORANGE_WARN",
    "BT_OK",
    "BT_KO",
    "LIVETRACK_MESSAGE",
    "AIRSPACE_CROSSED_SOON",
    "AIRSPACE_OBSTACLE",
    "CALL_REJECTED",
    "COMP_TURNPOINT_PREV",
    "LIVETRACK_ENABLED",
    "TEST",
    "_LANDING_CONFIRMATION_NEEDED",
    "BUTTON_CLICK",
];

/// Returns true if `name` is one of the registered events.
pub fn is_known_event(name: &str) -> bool {
    KNOWN_EVENTS.contains(&name)
}

/// Grouping used when presenting the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Takeoff and landing.
    Flight,
    /// Battery level and charging state.
    Battery,
    /// Thermal entry and exit.
    Thermal,
    /// Competition task cylinders.
    Competition,
    /// GPS and system status.
    System,
    /// Airspace warnings.
    Airspace,
    /// Bluetooth sensor link.
    Bluetooth,
    /// Live tracking.
    Livetrack,
    /// Anything else.
    Other,
}

impl EventCategory {
    /// Category of a catalog event.
    pub fn of(event: &str) -> Self {
        match event {
            "TAKEOFF" | "LANDING" | "_LANDING_CONFIRMATION_NEEDED" => Self::Flight,
            e if e.starts_with("BATTERY") => Self::Battery,
            "START_THERMALING" | "STOP_THERMALING" => Self::Thermal,
            e if e.starts_with("COMP_") => Self::Competition,
            "SYSTEM_GPS_OK" => Self::System,
            e if e.starts_with("AIRSPACE_") => Self::Airspace,
            "BT_OK" | "BT_KO" => Self::Bluetooth,
            e if e.starts_with("LIVETRACK_") => Self::Livetrack,
            _ => Self::Other,
        }
    }
}

/// Wire shape of a broadcast: an action name plus loosely typed extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastIntent {
    /// Fully qualified action name.
    pub action: String,
    /// Extras attached to the broadcast.
    #[serde(default)]
    pub extras: Map<String, Value>,
}

impl BroadcastIntent {
    /// Broadcast with no extras.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            extras: Map::new(),
        }
    }

    /// Attach an extra.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Broadcast for a named XCTrack event.
    pub fn for_event(name: &str) -> Self {
        Self::new(format!("{ACTION_PREFIX}{name}"))
    }
}

/// A decoded XCTrack event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightEvent {
    /// Event identifier with the action prefix stripped.
    pub name: String,
    /// The `formatArgs` extra, if any.
    pub format_args: Option<Value>,
}

impl FlightEvent {
    /// Event without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format_args: None,
        }
    }

    /// Decode a broadcast. Returns `None` for actions outside the XCTrack
    /// namespace and for events the agent did not register for.
    pub fn from_intent(intent: &BroadcastIntent) -> Option<Self> {
        let name = intent.action.strip_prefix(ACTION_PREFIX)?;
        if !is_known_event(name) {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            format_args: intent.extras.get(EXTRA_FORMAT_ARGS).cloned(),
        })
    }

    /// Latitude/longitude carried in `formatArgs`, when the sender included one.
    pub fn position(&self) -> Option<(f64, f64)> {
        let args = self.format_args.as_ref()?;
        let lat = args.get("lat")?.as_f64()?;
        let lon = args.get("lon")?.as_f64()?;
        Some((lat, lon))
    }
}
