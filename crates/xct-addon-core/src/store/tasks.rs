//! Library of saved reactions.

use crate::{
    CoreError, CoreResult,
    model::{Action, ActionColumns, ActionKind},
    store::Database,
};

use std::panic::Location;

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, instrument};

const SELECT_ALL: &str = "SELECT id, task_name, task_type, task_data, volume_type, \
     volume_percentage, play_count, telegram_chat_id, telegram_group_name, launch_in_background \
     FROM tasks ORDER BY task_name, id";

fn default_launch_in_background() -> bool {
    true
}

/// A named reaction kept for reuse across bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTask {
    /// Store-assigned id.
    pub id: i64,
    /// Label shown in the task picker.
    pub name: String,
    /// Reaction the task performs.
    pub action: Action,
    /// Return to the flight app right after launching another app.
    pub launch_in_background: bool,
}

/// A task that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Label shown in the task picker.
    pub name: String,
    /// Reaction the task performs.
    pub action: Action,
    /// Return to the flight app right after launching another app.
    #[serde(default = "default_launch_in_background")]
    pub launch_in_background: bool,
}

/// Saved tasks backed by the `tasks` table.
#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    /// Wrap an initialized database.
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Validate and store a task.
    #[instrument(skip(self, task), fields(name = %task.name, kind = ?task.action.kind()))]
    pub async fn add(&self, task: NewTask) -> CoreResult<SavedTask> {
        let name = task.name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidBinding {
                reason: "task name must not be empty".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        task.action.validate()?;
        let columns = ActionColumns::from_action(&task.action);

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (task_name, task_type, task_data, volume_type, volume_percentage,
                               play_count, telegram_chat_id, telegram_group_name,
                               launch_in_background)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(name)
        .bind(&columns.task_type)
        .bind(&columns.task_data)
        .bind(&columns.volume_type)
        .bind(columns.volume_percentage)
        .bind(columns.play_count)
        .bind(&columns.telegram_chat_id)
        .bind(&columns.telegram_group_name)
        .bind(task.launch_in_background)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(task_id = id, "Task saved");

        Ok(SavedTask {
            id,
            name: name.to_string(),
            action: task.action,
            launch_in_background: task.launch_in_background,
        })
    }

    /// Every saved task, by name.
    pub async fn list(&self) -> CoreResult<Vec<SavedTask>> {
        let rows = sqlx::query_as::<_, TaskRow>(SELECT_ALL)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(SavedTask::try_from).collect()
    }

    /// Look up one task.
    #[track_caller]
    pub async fn get(&self, id: i64) -> CoreResult<SavedTask> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT id, task_name, task_type, task_data, volume_type, volume_percentage, \
             play_count, telegram_chat_id, telegram_group_name, launch_in_background \
             FROM tasks WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => SavedTask::try_from(row),
            None => Err(CoreError::TaskNotFound {
                id,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Delete one task. Returns false if it did not exist.
    pub async fn delete(&self, id: i64) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every task of one kind. Returns how many were removed.
    pub async fn delete_kind(&self, kind: ActionKind) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE task_type = ?1")
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected();
        info!(kind = kind.as_str(), removed, "Tasks cleared");
        Ok(removed)
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    task_name: String,
    task_type: String,
    task_data: String,
    volume_type: String,
    volume_percentage: i64,
    play_count: i64,
    telegram_chat_id: Option<String>,
    telegram_group_name: Option<String>,
    launch_in_background: bool,
}

impl TryFrom<TaskRow> for SavedTask {
    type Error = CoreError;

    fn try_from(row: TaskRow) -> CoreResult<Self> {
        let action = ActionColumns {
            task_type: row.task_type,
            task_data: row.task_data,
            volume_type: row.volume_type,
            volume_percentage: row.volume_percentage,
            play_count: row.play_count,
            telegram_chat_id: row.telegram_chat_id,
            telegram_group_name: row.telegram_group_name,
        }
        .into_action()?;

        Ok(SavedTask {
            id: row.id,
            name: row.task_name,
            action,
            launch_in_background: row.launch_in_background,
        })
    }
}
