use xct_addon_core::FlightEvent;

use uuid::Uuid;

/// Commands sent from the event receiver and settings server to the main
/// application.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// React to an inbound flight event.
    HandleEvent {
        /// The decoded event.
        event: FlightEvent,
        /// Unique id tagging this dispatch in logs.
        session_id: Uuid,
    },
    /// Request application shutdown.
    Shutdown,
}
