//! Database connection and initialization.

use crate::{CoreError, CoreResult};

use std::{panic::Location, path::Path};

use error_location::ErrorLocation;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tracing::{info, instrument};

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Initialize the SQLite database.
///
/// Creates the database file if it doesn't exist, runs migrations,
/// and returns a connection pool. Pass [`IN_MEMORY`] for a throwaway store.
#[instrument]
pub async fn init_database(db_path: &str, max_connections: u32) -> CoreResult<Database> {
    let in_memory = db_path == IN_MEMORY;
    let db_url = if in_memory {
        "sqlite::memory:".to_string()
    } else {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        format!("sqlite:{}?mode=rwc", db_path)
    };

    info!(db_path, "Connecting to database");

    // Every in-memory connection is a separate database; pin a single one.
    let options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = options.connect(&db_url).await?;

    run_migrations(&pool).await?;

    Ok(Database { pool })
}

async fn run_migrations(pool: &SqlitePool) -> CoreResult<()> {
    let migration_sql = include_str!("../../migrations/001_init.sql");

    for statement in migration_sql.split(';') {
        let statement: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }

        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| CoreError::Migration {
                reason: format!("{e}: {statement}"),
                location: ErrorLocation::from(Location::caller()),
            })?;
    }

    info!("Database migrations complete");
    Ok(())
}
