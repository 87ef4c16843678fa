//! Saved Telegram message templates.

use crate::{CoreError, CoreResult, store::Database};

use std::panic::Location;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

/// A reusable message body picked when configuring a message binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageTemplate {
    /// Store-assigned id.
    pub id: i64,
    /// Short label shown in pickers.
    pub title: String,
    /// Message text.
    pub body: String,
}

/// Message templates backed by the `messages` table.
#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Wrap an initialized database.
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Store a new template.
    pub async fn add(&self, title: &str, body: &str) -> CoreResult<MessageTemplate> {
        if title.trim().is_empty() || body.trim().is_empty() {
            return Err(CoreError::InvalidBinding {
                reason: "message title and body must not be empty".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let result = sqlx::query("INSERT INTO messages (title, body) VALUES (?1, ?2)")
            .bind(title)
            .bind(body)
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_rowid();
        info!(message_id = id, title, "Message template added");

        Ok(MessageTemplate {
            id,
            title: title.to_string(),
            body: body.to_string(),
        })
    }

    /// All templates ordered by title.
    pub async fn list(&self) -> CoreResult<Vec<MessageTemplate>> {
        let rows = sqlx::query_as::<_, MessageTemplate>(
            "SELECT id, title, body FROM messages ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete a template. Returns false if it did not exist.
    pub async fn delete(&self, id: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
