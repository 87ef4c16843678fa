//! SQLite persistence for bindings, message templates and saved tasks.

mod bindings;
mod db;
mod messages;
mod tasks;

pub use {
    bindings::{BindingStore, DEFAULT_SOUND_FILE},
    db::{Database, IN_MEMORY, init_database},
    messages::{MessageStore, MessageTemplate},
    tasks::{NewTask, SavedTask, TaskStore},
};
