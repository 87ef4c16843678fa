use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

/// Errors raised by the reaction pipeline, with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database query or connection failure.
    #[error("Database error: {source} {location}")]
    Database {
        /// Underlying sqlx error.
        #[source]
        source: sqlx::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Schema migration failed.
    #[error("Migration failed: {reason} {location}")]
    Migration {
        /// Description of the failing statement.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No binding with the given id exists.
    #[error("Binding not found: {id} {location}")]
    BindingNotFound {
        /// Id that was looked up.
        id: i64,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No saved task with the given id.
    #[error("Task not found: {id} {location}")]
    TaskNotFound {
        /// Id that was looked up.
        id: i64,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Another binding already reacts to this event.
    #[error("Event already bound: {event} {location}")]
    DuplicateEvent {
        /// The event identifier that is already in use.
        event: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Binding parameters are out of range or incomplete.
    #[error("Invalid binding: {reason} {location}")]
    InvalidBinding {
        /// What is wrong with the binding.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Sound file missing from both the user and bundled directories.
    #[error("Sound file not found: {file} {location}")]
    SoundNotFound {
        /// Requested file name.
        file: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio output device could not be opened.
    #[error("Audio device error: {reason} {location}")]
    AudioDevice {
        /// Description of the device error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Sound file could not be opened or decoded.
    #[error("Audio decode error: {reason} {location}")]
    AudioDecode {
        /// Description of the decode error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Application launch failed.
    #[error("Launch failed for {target}: {reason} {location}")]
    Launch {
        /// Identifier that was launched.
        target: String,
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Outbound broadcast could not be sent.
    #[error("Broadcast failed: {reason} {location}")]
    Broadcast {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Telegram API rejected the call or the reply was malformed.
    #[error("Telegram error: {reason} {location}")]
    Telegram {
        /// API description or parse failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// HTTP transport failure.
    #[error("HTTP error: {source} {location}")]
    Http {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No position has been reported yet.
    #[error("Location unavailable {location}")]
    LocationUnavailable {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Preferences file could not be read or written.
    #[error("Preferences error: {reason} {location}")]
    Preferences {
        /// Description of the failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Filesystem error.
    #[error("IO error: {source} {location}")]
    Io {
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl From<sqlx::Error> for CoreError {
    #[track_caller]
    fn from(source: sqlx::Error) -> Self {
        CoreError::Database {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for CoreError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        CoreError::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for CoreError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        CoreError::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
