use crate::config::{default_database_path, default_max_connections};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Binding database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding bindings and message templates.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}
