//! Process-local entry store.
//!
//! Holds records in maps behind [`tokio::sync::RwLock`]s. Each
//! operation takes the lock once, so a single create, update, or delete is
//! atomic with respect to concurrent readers. There is no persistence and
//! no sharing across processes: this backend is for tests, demos, and
//! single-instance deployments without a database.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use queueless_types::{
    Appointment, AppointmentId, AppointmentPatch, EntryFilter, QueueEntry, QueueEntryId,
    QueueStatus, Session, UserAccount,
};
use tokio::sync::RwLock;

/// In-memory queue entries, appointments, and accounts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<QueueEntryId, QueueEntry>>,
    appointments: RwLock<BTreeMap<AppointmentId, Appointment>>,
    /// Keyed by normalized email.
    users: RwLock<HashMap<String, UserAccount>>,
    /// Keyed by bearer token.
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queue entries
    // =========================================================================

    /// Insert an entry, replacing any entry with the same id.
    pub async fn insert_entry(&self, entry: QueueEntry) {
        self.entries.write().await.insert(entry.id, entry);
    }

    /// Look up one entry.
    pub async fn find_entry(&self, id: QueueEntryId) -> Option<QueueEntry> {
        self.entries.read().await.get(&id).cloned()
    }

    /// Entries matching `filter`, in join order.
    pub async fn list_entries(&self, filter: &EntryFilter) -> Vec<QueueEntry> {
        let mut entries: Vec<QueueEntry> = self
            .entries
            .read()
            .await
            .values()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        entries.sort_by(|a, b| (a.joined_at, a.id).cmp(&(b.joined_at, b.id)));
        entries
    }

    /// Set one entry's status. `None` when the id is unknown.
    pub async fn update_entry_status(
        &self,
        id: QueueEntryId,
        status: QueueStatus,
        updated_at: DateTime<Utc>,
    ) -> Option<QueueEntry> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id)?;
        entry.status = status;
        entry.updated_at = updated_at;
        Some(entry.clone())
    }

    /// Remove one entry. Returns whether it existed.
    pub async fn delete_entry(&self, id: QueueEntryId) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    /// Insert an appointment, replacing any with the same id.
    pub async fn insert_appointment(&self, appointment: Appointment) {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment);
    }

    /// Look up one appointment.
    pub async fn find_appointment(&self, id: AppointmentId) -> Option<Appointment> {
        self.appointments.read().await.get(&id).cloned()
    }

    /// All appointments, earliest date and time first.
    pub async fn list_appointments(&self) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> =
            self.appointments.read().await.values().cloned().collect();
        appointments.sort_by(|a, b| a.schedule_key().cmp(&b.schedule_key()));
        appointments
    }

    /// Apply `patch` to one appointment. `None` when the id is unknown.
    pub async fn update_appointment(
        &self,
        id: AppointmentId,
        patch: &AppointmentPatch,
        updated_at: DateTime<Utc>,
    ) -> Option<Appointment> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments.get_mut(&id)?;
        apply_patch(appointment, patch);
        appointment.updated_at = updated_at;
        Some(appointment.clone())
    }

    /// Remove one appointment. Returns whether it existed.
    pub async fn delete_appointment(&self, id: AppointmentId) -> bool {
        self.appointments.write().await.remove(&id).is_some()
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert an account unless its email is taken. Returns whether it
    /// was inserted.
    pub async fn insert_user(&self, user: UserAccount) -> bool {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return false;
        }
        users.insert(user.email.clone(), user);
        true
    }

    /// Look up an account by normalized email.
    pub async fn find_user_by_email(&self, email: &str) -> Option<UserAccount> {
        self.users.read().await.get(email).cloned()
    }

    /// Record an issued token.
    pub async fn insert_session(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session);
    }

    /// Look up a token, expired or not.
    pub async fn find_session(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Drop tokens that are no longer live at `now`. Returns how many.
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> u64 {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_live(now));
        u64::try_from(before.saturating_sub(sessions.len())).unwrap_or(u64::MAX)
    }
}

fn apply_patch(appointment: &mut Appointment, patch: &AppointmentPatch) {
    if let Some(status) = patch.status {
        appointment.status = status;
    }
    if let Some(notes) = &patch.notes {
        appointment.notes.clone_from(notes);
    }
    if let Some(service_type) = &patch.service_type {
        appointment.service_type.clone_from(service_type);
    }
    if let Some(date) = &patch.appointment_date {
        appointment.appointment_date.clone_from(date);
    }
    if let Some(time) = &patch.appointment_time {
        appointment.appointment_time.clone_from(time);
    }
}
