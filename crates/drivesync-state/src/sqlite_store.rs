//! SQLite implementation of ICheckpointStore
//!
//! Each store instance owns one named row of the `checkpoints` table, so
//! several independent mirrors can share a database file.
//!
//! | Column       | Contents                               |
//! |--------------|----------------------------------------|
//! | `name`       | checkpoint identity (primary key)      |
//! | `cursor`     | change feed resume position            |
//! | `updated_at` | RFC 3339 timestamp of the last write   |

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use drivesync_core::{domain::ChangeCursor, ports::ICheckpointStore};

use crate::StateError;

/// A stored checkpoint row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointEntry {
    pub name: String,
    /// Raw stored value; may be the uninitialized sentinel
    pub cursor: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CheckpointEntry {
    /// The stored value as a usable cursor, `None` when uninitialized
    pub fn cursor(&self) -> Option<ChangeCursor> {
        ChangeCursor::from_stored(Some(&self.cursor))
    }
}

fn row_to_entry(row: &SqliteRow) -> CheckpointEntry {
    let updated_at: String = row.get("updated_at");
    CheckpointEntry {
        name: row.get("name"),
        cursor: row.get("cursor"),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Checkpoint store backed by one row of a SQLite table
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
    name: String,
}

impl SqliteCheckpointStore {
    /// Creates a store for the checkpoint called `name`
    pub fn new(pool: SqlitePool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read this store's row, including its timestamp
    pub async fn entry(&self) -> Result<Option<CheckpointEntry>, StateError> {
        let row = sqlx::query("SELECT name, cursor, updated_at FROM checkpoints WHERE name = ?")
            .bind(&self.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StateError::QueryFailed(format!("Failed to read checkpoint: {e}")))?;

        Ok(row.as_ref().map(row_to_entry))
    }

    /// Every checkpoint stored in the database, ordered by name
    pub async fn list_all(&self) -> Result<Vec<CheckpointEntry>, StateError> {
        let rows = sqlx::query("SELECT name, cursor, updated_at FROM checkpoints ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StateError::QueryFailed(format!("Failed to list checkpoints: {e}")))?;

        Ok(rows.iter().map(row_to_entry).collect())
    }
}

#[async_trait::async_trait]
impl ICheckpointStore for SqliteCheckpointStore {
    async fn get(&self) -> anyhow::Result<Option<ChangeCursor>> {
        Ok(self.entry().await?.and_then(|entry| entry.cursor()))
    }

    async fn put(&self, cursor: &ChangeCursor) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO checkpoints (name, cursor, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(name) DO UPDATE SET cursor = excluded.cursor, updated_at = excluded.updated_at",
        )
        .bind(&self.name)
        .bind(cursor.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::QueryFailed(format!("Failed to write checkpoint: {e}")))?;

        tracing::debug!(name = %self.name, cursor = %cursor, "Checkpoint stored");
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM checkpoints WHERE name = ?")
            .bind(&self.name)
            .execute(&self.pool)
            .await
            .map_err(|e| StateError::QueryFailed(format!("Failed to delete checkpoint: {e}")))?;

        tracing::info!(
            name = %self.name,
            removed = result.rows_affected(),
            "Checkpoint cleared"
        );
        Ok(())
    }
}
