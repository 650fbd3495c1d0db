//! Backend-independent entry store handle.
//!
//! [`EntryStore`] uses enum dispatch instead of a trait object because
//! async methods are not dyn-compatible. Callers hold one cheap-to-clone
//! handle and never learn which backend sits behind it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use queueless_types::{
    Appointment, AppointmentId, AppointmentPatch, EntryFilter, QueueEntry, QueueEntryId,
    QueueStatus, Session, UserAccount,
};

use crate::account_store::AccountStore;
use crate::appointment_store::AppointmentStore;
use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::postgres::PostgresPool;
use crate::queue_store::QueueStore;

/// The single source of truth for queue entries, appointments, and
/// accounts.
#[derive(Clone)]
pub enum EntryStore {
    /// Process-local maps; lost on restart.
    Memory(Arc<MemoryStore>),
    /// Durable `PostgreSQL` tables.
    Postgres(PostgresPool),
}

impl EntryStore {
    /// A fresh, empty in-memory store.
    pub fn in_memory() -> Self {
        Self::Memory(Arc::new(MemoryStore::new()))
    }

    /// Human-readable backend name for logging.
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Check that the backend can serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] when the database is unreachable.
    pub async fn health_check(&self) -> Result<(), DbError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Postgres(pg) => pg.ping().await,
        }
    }

    // =========================================================================
    // Queue entries
    // =========================================================================

    /// Persist a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend rejects the write.
    pub async fn create_entry(&self, entry: &QueueEntry) -> Result<(), DbError> {
        match self {
            Self::Memory(mem) => {
                mem.insert_entry(entry.clone()).await;
                Ok(())
            }
            Self::Postgres(pg) => QueueStore::new(pg.pool()).insert(entry).await,
        }
    }

    /// Read one entry by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn find_entry(&self, id: QueueEntryId) -> Result<Option<QueueEntry>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.find_entry(id).await),
            Self::Postgres(pg) => QueueStore::new(pg.pool()).find(id).await,
        }
    }

    /// Read all entries matching `filter`, in join order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<QueueEntry>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_entries(filter).await),
            Self::Postgres(pg) => QueueStore::new(pg.pool()).list(filter).await,
        }
    }

    /// Change one entry's status; `Ok(None)` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend write fails.
    pub async fn update_entry_status(
        &self,
        id: QueueEntryId,
        status: QueueStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<QueueEntry>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.update_entry_status(id, status, updated_at).await),
            Self::Postgres(pg) => {
                QueueStore::new(pg.pool())
                    .update_status(id, status, updated_at)
                    .await
            }
        }
    }

    /// Delete one entry; `Ok(false)` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend write fails.
    pub async fn delete_entry(&self, id: QueueEntryId) -> Result<bool, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.delete_entry(id).await),
            Self::Postgres(pg) => QueueStore::new(pg.pool()).delete(id).await,
        }
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    /// Persist a new appointment.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend rejects the write.
    pub async fn create_appointment(&self, appointment: &Appointment) -> Result<(), DbError> {
        match self {
            Self::Memory(mem) => {
                mem.insert_appointment(appointment.clone()).await;
                Ok(())
            }
            Self::Postgres(pg) => AppointmentStore::new(pg.pool()).insert(appointment).await,
        }
    }

    /// Read one appointment by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn find_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.find_appointment(id).await),
            Self::Postgres(pg) => AppointmentStore::new(pg.pool()).find(id).await,
        }
    }

    /// Read every appointment, earliest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_appointments().await),
            Self::Postgres(pg) => AppointmentStore::new(pg.pool()).list().await,
        }
    }

    /// Apply a partial update; `Ok(None)` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend write fails.
    pub async fn update_appointment(
        &self,
        id: AppointmentId,
        patch: &AppointmentPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Appointment>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.update_appointment(id, patch, updated_at).await),
            Self::Postgres(pg) => {
                AppointmentStore::new(pg.pool())
                    .update(id, patch, updated_at)
                    .await
            }
        }
    }

    /// Delete one appointment; `Ok(false)` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend write fails.
    pub async fn delete_appointment(&self, id: AppointmentId) -> Result<bool, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.delete_appointment(id).await),
            Self::Postgres(pg) => AppointmentStore::new(pg.pool()).delete(id).await,
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Persist a new account; `Ok(false)` when the email is already
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend rejects the write.
    pub async fn create_user(&self, user: &UserAccount) -> Result<bool, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.insert_user(user.clone()).await),
            Self::Postgres(pg) => AccountStore::new(pg.pool()).insert_user(user).await,
        }
    }

    /// Read one account by normalized email.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.find_user_by_email(email).await),
            Self::Postgres(pg) => AccountStore::new(pg.pool()).find_user_by_email(email).await,
        }
    }

    /// Persist an issued token.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend rejects the write.
    pub async fn create_session(&self, session: &Session) -> Result<(), DbError> {
        match self {
            Self::Memory(mem) => {
                mem.insert_session(session.clone()).await;
                Ok(())
            }
            Self::Postgres(pg) => AccountStore::new(pg.pool()).insert_session(session).await,
        }
    }

    /// Read one token's session, whether or not it has expired.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend read fails.
    pub async fn find_session(&self, token: &str) -> Result<Option<Session>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.find_session(token).await),
            Self::Postgres(pg) => AccountStore::new(pg.pool()).find_session(token).await,
        }
    }

    /// Delete sessions that expired at or before `now`. Returns how many.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend write fails.
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.delete_expired_sessions(now).await),
            Self::Postgres(pg) => {
                AccountStore::new(pg.pool())
                    .delete_expired_sessions(now)
                    .await
            }
        }
    }
}

impl core::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("EntryStore").field(&self.backend_name()).finish()
    }
}
