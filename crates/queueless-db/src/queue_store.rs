//! `PostgreSQL` operations on the `queue_entries` table.
//!
//! Only durable fields are persisted. Every read that feeds position
//! computation returns rows in join order (`joined_at`, then `id`), the
//! same order the position engine uses.

use chrono::{DateTime, Utc};
use queueless_types::{EntryFilter, QueueEntry, QueueEntryId, QueueStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `queue_entries` table.
pub struct QueueStore<'a> {
    pool: &'a PgPool,
}

impl<'a> QueueStore<'a> {
    /// Create a new queue store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly created entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, entry: &QueueEntry) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO queue_entries
                (id, student_name, service_type, contact_number, status, joined_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id.into_inner())
        .bind(&entry.student_name)
        .bind(&entry.service_type)
        .bind(&entry.contact_number)
        .bind(entry.status.as_str())
        .bind(entry.joined_at)
        .bind(entry.updated_at)
        .execute(self.pool)
        .await?;

        tracing::debug!(entry_id = %entry.id, "Inserted queue entry");
        Ok(())
    }

    /// Load one entry by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Decode`] if the stored status is unknown.
    pub async fn find(&self, id: QueueEntryId) -> Result<Option<QueueEntry>, DbError> {
        let row = sqlx::query_as::<_, QueueEntryRow>(
            r"SELECT id, student_name, service_type, contact_number, status, joined_at, updated_at
              FROM queue_entries
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(QueueEntry::try_from).transpose()
    }

    /// List entries matching `filter`, in join order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Decode`] if a stored status is unknown.
    pub async fn list(&self, filter: &EntryFilter) -> Result<Vec<QueueEntry>, DbError> {
        let rows = sqlx::query_as::<_, QueueEntryRow>(
            r"SELECT id, student_name, service_type, contact_number, status, joined_at, updated_at
              FROM queue_entries
              WHERE ($1::TEXT IS NULL OR status = $1)
                AND ($2::TEXT IS NULL OR service_type = $2)
              ORDER BY joined_at ASC, id ASC",
        )
        .bind(filter.status.map(QueueStatus::as_str))
        .bind(filter.service_type.as_deref())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(QueueEntry::try_from).collect()
    }

    /// Set the status of one entry, returning the updated record.
    ///
    /// Returns `Ok(None)` when no entry has this id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_status(
        &self,
        id: QueueEntryId,
        status: QueueStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<QueueEntry>, DbError> {
        let row = sqlx::query_as::<_, QueueEntryRow>(
            r"UPDATE queue_entries
              SET status = $2, updated_at = $3
              WHERE id = $1
              RETURNING id, student_name, service_type, contact_number, status, joined_at, updated_at",
        )
        .bind(id.into_inner())
        .bind(status.as_str())
        .bind(updated_at)
        .fetch_optional(self.pool)
        .await?;

        row.map(QueueEntry::try_from).transpose()
    }

    /// Delete one entry. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&self, id: QueueEntryId) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM queue_entries WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// A row from the `queue_entries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueEntryRow {
    /// Entry id.
    pub id: Uuid,
    /// Student display name.
    pub student_name: String,
    /// Service grouping key.
    pub service_type: String,
    /// Call-back number.
    pub contact_number: String,
    /// Status wire string.
    pub status: String,
    /// Join timestamp.
    pub joined_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<QueueEntryRow> for QueueEntry {
    type Error = DbError;

    fn try_from(row: QueueEntryRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<QueueStatus>()
            .map_err(|e| DbError::Decode(format!("queue entry {}: {e}", row.id)))?;

        Ok(Self {
            id: QueueEntryId::from(row.id),
            student_name: row.student_name,
            service_type: row.service_type,
            contact_number: row.contact_number,
            status,
            joined_at: row.joined_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> QueueEntryRow {
        let now = Utc::now();
        QueueEntryRow {
            id: Uuid::now_v7(),
            student_name: String::from("Alice"),
            service_type: String::from("IT Support"),
            contact_number: String::from("0412345678"),
            status: status.to_owned(),
            joined_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_decodes_spaced_status() {
        let entry = QueueEntry::try_from(row("In Progress"));
        assert_eq!(entry.ok().map(|e| e.status), Some(QueueStatus::InProgress));
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        let result = QueueEntry::try_from(row("Called"));
        assert!(matches!(result, Err(DbError::Decode(_))));
    }
}
