//! `PostgreSQL` operations on the `appointments` table.

use chrono::{DateTime, Utc};
use queueless_types::{Appointment, AppointmentId, AppointmentPatch, AppointmentStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `appointments` table.
pub struct AppointmentStore<'a> {
    pool: &'a PgPool,
}

impl<'a> AppointmentStore<'a> {
    /// Create a new appointment store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new appointment.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, appointment: &Appointment) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO appointments
                (id, student_name, service_type, appointment_date, appointment_time,
                 notes, status, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(appointment.id.into_inner())
        .bind(&appointment.student_name)
        .bind(&appointment.service_type)
        .bind(&appointment.appointment_date)
        .bind(&appointment.appointment_time)
        .bind(&appointment.notes)
        .bind(appointment.status.as_str())
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Load one appointment by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find(&self, id: AppointmentId) -> Result<Option<Appointment>, DbError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r"SELECT id, student_name, service_type, appointment_date, appointment_time,
                     notes, status, created_at, updated_at
              FROM appointments
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(Appointment::try_from).transpose()
    }

    /// List all appointments, earliest date and time first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<Appointment>, DbError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            r"SELECT id, student_name, service_type, appointment_date, appointment_time,
                     notes, status, created_at, updated_at
              FROM appointments
              ORDER BY appointment_date ASC, appointment_time ASC, id ASC",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Appointment::try_from).collect()
    }

    /// Apply `patch` to one appointment. Absent patch fields keep their
    /// stored value.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update(
        &self,
        id: AppointmentId,
        patch: &AppointmentPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Appointment>, DbError> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r"UPDATE appointments
              SET status           = COALESCE($2, status),
                  notes            = COALESCE($3, notes),
                  service_type     = COALESCE($4, service_type),
                  appointment_date = COALESCE($5, appointment_date),
                  appointment_time = COALESCE($6, appointment_time),
                  updated_at       = $7
              WHERE id = $1
              RETURNING id, student_name, service_type, appointment_date, appointment_time,
                        notes, status, created_at, updated_at",
        )
        .bind(id.into_inner())
        .bind(patch.status.map(AppointmentStatus::as_str))
        .bind(patch.notes.as_deref())
        .bind(patch.service_type.as_deref())
        .bind(patch.appointment_date.as_deref())
        .bind(patch.appointment_time.as_deref())
        .bind(updated_at)
        .fetch_optional(self.pool)
        .await?;

        row.map(Appointment::try_from).transpose()
    }

    /// Delete one appointment. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&self, id: AppointmentId) -> Result<bool, DbError> {
        let result = sqlx::query(r"DELETE FROM appointments WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// A row from the `appointments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    /// Appointment id.
    pub id: Uuid,
    /// Student display name.
    pub student_name: String,
    /// Service booked.
    pub service_type: String,
    /// `YYYY-MM-DD`.
    pub appointment_date: String,
    /// `HH:MM`.
    pub appointment_time: String,
    /// Notes, empty when none.
    pub notes: String,
    /// Status wire string.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<AppointmentStatus>()
            .map_err(|e| DbError::Decode(format!("appointment {}: {e}", row.id)))?;

        Ok(Self {
            id: AppointmentId::from(row.id),
            student_name: row.student_name,
            service_type: row.service_type,
            appointment_date: row.appointment_date,
            appointment_time: row.appointment_time,
            notes: row.notes,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
