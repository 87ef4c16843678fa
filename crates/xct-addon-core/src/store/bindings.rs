//! Binding persistence: the ordered event → action list.

use crate::{
    CoreError, CoreResult,
    model::{Action, ActionColumns, Binding, KNOWN_EVENTS, NewBinding, VolumePolicy, is_known_event},
    store::Database,
};

use std::panic::Location;

use error_location::ErrorLocation;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

/// Sound seeded into an empty store on first run.
pub const DEFAULT_SOUND_FILE: &str = "beep.mp3";

const SELECT_ALL: &str = "SELECT id, event, task_type, task_data, volume_type, volume_percentage, \
     play_count, position, telegram_chat_id, telegram_group_name \
     FROM event_configs ORDER BY position, id";

/// Ordered binding list backed by the `event_configs` table.
///
/// Readers get a full snapshot per call; nothing is cached in memory.
#[derive(Clone)]
pub struct BindingStore {
    pool: SqlitePool,
}

impl BindingStore {
    /// Wrap an initialized database.
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// All bindings, ordered by position.
    pub async fn list(&self) -> CoreResult<Vec<Binding>> {
        let rows = sqlx::query_as::<_, BindingRow>(SELECT_ALL)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Binding::try_from).collect()
    }

    /// Binding with the given id.
    pub async fn get(&self, id: i64) -> CoreResult<Binding> {
        let row = sqlx::query_as::<_, BindingRow>(
            "SELECT id, event, task_type, task_data, volume_type, volume_percentage, \
             play_count, position, telegram_chat_id, telegram_group_name \
             FROM event_configs WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Binding::try_from(row),
            None => Err(CoreError::BindingNotFound {
                id,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Append a binding at the end of the list.
    #[instrument(skip(self))]
    pub async fn add(&self, binding: NewBinding) -> CoreResult<Binding> {
        check_event(&binding.event)?;
        binding.action.validate()?;
        let columns = ActionColumns::from_action(&binding.action);

        let mut tx = self.pool.begin().await?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM event_configs")
            .fetch_one(&mut *tx)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO event_configs (event, task_type, task_data, volume_type, volume_percentage,
                play_count, position, telegram_chat_id, telegram_group_name)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&binding.event)
        .bind(&columns.task_type)
        .bind(&columns.task_data)
        .bind(&columns.volume_type)
        .bind(columns.volume_percentage)
        .bind(columns.play_count)
        .bind(count)
        .bind(&columns.telegram_chat_id)
        .bind(&columns.telegram_group_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, &binding.event))?;

        tx.commit().await?;

        let stored = Binding {
            id: result.last_insert_rowid(),
            event: binding.event,
            action: binding.action,
            position: count,
        };

        info!(
            binding_id = stored.id,
            event = %stored.event,
            kind = ?stored.action.kind(),
            position = stored.position,
            "Binding added"
        );

        Ok(stored)
    }

    /// Replace the event and action of an existing binding. Position is kept.
    #[instrument(skip(self))]
    pub async fn update(&self, binding: &Binding) -> CoreResult<()> {
        check_event(&binding.event)?;
        binding.action.validate()?;
        let columns = ActionColumns::from_action(&binding.action);

        let result = sqlx::query(
            r#"
            UPDATE event_configs SET
                event = ?2, task_type = ?3, task_data = ?4, volume_type = ?5,
                volume_percentage = ?6, play_count = ?7,
                telegram_chat_id = ?8, telegram_group_name = ?9
            WHERE id = ?1
            "#,
        )
        .bind(binding.id)
        .bind(&binding.event)
        .bind(&columns.task_type)
        .bind(&columns.task_data)
        .bind(&columns.volume_type)
        .bind(columns.volume_percentage)
        .bind(columns.play_count)
        .bind(&columns.telegram_chat_id)
        .bind(&columns.telegram_group_name)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &binding.event))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::BindingNotFound {
                id: binding.id,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(binding_id = binding.id, event = %binding.event, "Binding updated");
        Ok(())
    }

    /// Remove a binding and renumber the remaining ones.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM event_configs WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::BindingNotFound {
                id,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let ids = ordered_ids(&mut tx).await?;
        renumber(&mut tx, &ids).await?;
        tx.commit().await?;

        info!(binding_id = id, remaining = ids.len(), "Binding deleted");
        Ok(())
    }

    /// Move the binding at index `from` to index `to` and renumber.
    ///
    /// Afterwards every binding has a unique position in `0..len`.
    #[instrument(skip(self))]
    pub async fn reorder(&self, from: usize, to: usize) -> CoreResult<Vec<Binding>> {
        let mut tx = self.pool.begin().await?;

        let mut ids = ordered_ids(&mut tx).await?;
        if from >= ids.len() || to >= ids.len() {
            return Err(CoreError::InvalidBinding {
                reason: format!(
                    "reorder index out of range: from={from} to={to} len={}",
                    ids.len()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let moved = ids.remove(from);
        ids.insert(to, moved);
        renumber(&mut tx, &ids).await?;
        tx.commit().await?;

        debug!(from, to, "Bindings reordered");
        self.list().await
    }

    /// Catalog events that no binding uses yet.
    pub async fn available_events(&self) -> CoreResult<Vec<&'static str>> {
        let used: Vec<(String,)> = sqlx::query_as("SELECT event FROM event_configs")
            .fetch_all(&self.pool)
            .await?;

        Ok(KNOWN_EVENTS
            .iter()
            .copied()
            .filter(|event| !used.iter().any(|(used,)| used.as_str() == *event))
            .collect())
    }

    /// Seed a default sound binding when the store is empty.
    ///
    /// Returns the seeded binding, or `None` if bindings already exist.
    pub async fn ensure_default(&self) -> CoreResult<Option<Binding>> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM event_configs")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(None);
        }

        let seeded = self
            .add(NewBinding {
                event: KNOWN_EVENTS[0].to_string(),
                action: Action::Sound {
                    file: DEFAULT_SOUND_FILE.to_string(),
                    volume: VolumePolicy::System,
                    play_count: 1,
                },
            })
            .await?;

        Ok(Some(seeded))
    }
}

async fn ordered_ids(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>) -> CoreResult<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM event_configs ORDER BY position, id")
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

async fn renumber(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, ids: &[i64]) -> CoreResult<()> {
    for (position, id) in ids.iter().enumerate() {
        sqlx::query("UPDATE event_configs SET position = ?1 WHERE id = ?2 AND position != ?1")
            .bind(position as i64)
            .bind(*id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[track_caller]
fn map_unique_violation(err: sqlx::Error, event: &str) -> CoreError {
    let is_unique = matches!(&err, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
    if is_unique {
        CoreError::DuplicateEvent {
            event: event.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    } else {
        CoreError::from(err)
    }
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct BindingRow {
    id: i64,
    event: String,
    task_type: String,
    task_data: String,
    volume_type: String,
    volume_percentage: i64,
    play_count: i64,
    position: i64,
    telegram_chat_id: Option<String>,
    telegram_group_name: Option<String>,
}

impl TryFrom<BindingRow> for Binding {
    type Error = CoreError;

    fn try_from(row: BindingRow) -> CoreResult<Self> {
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

        Ok(Binding {
            id: row.id,
            event: row.event,
            action,
            position: row.position,
        })
    }
}

/// Only catalog events can be bound; others are never delivered.
#[track_caller]
fn check_event(event: &str) -> CoreResult<()> {
    if is_known_event(event) {
        Ok(())
    } else {
        Err(CoreError::InvalidBinding {
            reason: format!("unknown event: {}", event),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
