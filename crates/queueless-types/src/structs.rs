//! Core record and view structs.
//!
//! Stored records ([`QueueEntry`], [`Appointment`]) hold only durable
//! fields. Position and wait time are never stored; they live on
//! [`QueueEntryView`] and [`WaitTimeEstimate`], which are rebuilt from the
//! current set of waiting entries every time they are served.
//!
//! Account records ([`UserAccount`], [`Session`]) hold secrets and are
//! never serialized; callers only ever see a [`LoginResponse`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AppointmentStatus, QueueStatus, Role};
use crate::ids::{AppointmentId, QueueEntryId, UserId};

// ---------------------------------------------------------------------------
// Queue entries
// ---------------------------------------------------------------------------

/// One student's slot in the virtual queue, as persisted by the entry store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct QueueEntry {
    /// Assigned at creation, immutable.
    pub id: QueueEntryId,
    /// Display name of the student.
    pub student_name: String,
    /// Service requested; the default grouping key for positions.
    pub service_type: String,
    /// Phone number staff can call when the student is up.
    pub contact_number: String,
    /// Current lifecycle status.
    pub status: QueueStatus,
    /// When the student joined. Immutable; orders the line.
    pub joined_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// A queue entry with its live position and wait estimate.
///
/// `position` and `estimated_wait_time` are `None` unless the entry is
/// [`QueueStatus::Waiting`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct QueueEntryView {
    /// The stored record.
    #[serde(flatten)]
    #[ts(flatten)]
    pub entry: QueueEntry,
    /// 1-based rank among waiting entries in the same group.
    pub position: Option<u32>,
    /// Minutes until the student is expected to be served.
    pub estimated_wait_time: Option<u32>,
}

/// The lightweight polling answer for a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct WaitTimeEstimate {
    /// 1-based rank, `None` when not waiting.
    pub position: Option<u32>,
    /// Minutes of expected wait, `None` when not waiting.
    pub estimated_wait_time: Option<u32>,
    /// Current status.
    pub status: QueueStatus,
}

/// Summary counts for the staff dashboard header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct QueueStats {
    /// Entries currently in line.
    pub waiting: u32,
    /// Entries being served.
    pub in_progress: u32,
    /// Entries served.
    pub completed: u32,
    /// Entries cancelled.
    pub cancelled: u32,
    /// Distinct service types that have someone waiting.
    pub active_services: u32,
    /// Wait estimate for a student joining the longest line right now.
    pub longest_wait_time: u32,
}

/// Roster filter; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Only entries with this status.
    pub status: Option<QueueStatus>,
    /// Only entries for this service type (exact match).
    pub service_type: Option<String>,
}

impl EntryFilter {
    /// Whether `entry` passes this filter.
    pub fn matches(&self, entry: &QueueEntry) -> bool {
        self.status.is_none_or(|s| s == entry.status)
            && self
                .service_type
                .as_deref()
                .is_none_or(|s| s == entry.service_type)
    }
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

/// A booked service appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Appointment {
    /// Assigned at creation.
    pub id: AppointmentId,
    /// Display name of the student.
    pub student_name: String,
    /// Service booked.
    pub service_type: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub appointment_date: String,
    /// Time of day, `HH:MM` (24h).
    pub appointment_time: String,
    /// Free-form notes; empty when none were given.
    pub notes: String,
    /// Current status.
    pub status: AppointmentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Sort key: date, then time, then id for stability.
    pub fn schedule_key(&self) -> (&str, &str, AppointmentId) {
        (&self.appointment_date, &self.appointment_time, self.id)
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// A registered student or staff member.
#[derive(Clone, PartialEq, Eq)]
pub struct UserAccount {
    /// Assigned at signup.
    pub id: UserId,
    /// Login name; stored trimmed and lowercased, unique.
    pub email: String,
    /// PHC-format password hash. Never leaves the server.
    pub password_hash: String,
    /// Fixed at signup.
    pub role: Role,
    /// Signup timestamp.
    pub created_at: DateTime<Utc>,
}

impl core::fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A bearer token issued at login.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// The opaque bearer secret.
    pub token: String,
    /// Account the token was issued to.
    pub user_id: UserId,
    /// Account email at issue time, used as the log subject.
    pub email: String,
    /// Account role at issue time.
    pub role: Role,
    /// Login timestamp.
    pub issued_at: DateTime<Utc>,
    /// The token is refused from this instant on.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the token is still accepted at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Body returned by `POST /api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LoginResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Role the token carries.
    pub role: Role,
    /// When the token stops working.
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(status: QueueStatus, service: &str) -> QueueEntry {
        let now = Utc::now();
        QueueEntry {
            id: QueueEntryId::new(),
            student_name: String::from("Alice"),
            service_type: service.to_owned(),
            contact_number: String::from("0412345678"),
            status,
            joined_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = EntryFilter::default();
        assert!(filter.matches(&entry(QueueStatus::Waiting, "IT Support")));
        assert!(filter.matches(&entry(QueueStatus::Cancelled, "Library")));
    }

    #[test]
    fn filter_combines_status_and_service() {
        let filter = EntryFilter {
            status: Some(QueueStatus::Waiting),
            service_type: Some(String::from("IT Support")),
        };
        assert!(filter.matches(&entry(QueueStatus::Waiting, "IT Support")));
        assert!(!filter.matches(&entry(QueueStatus::InProgress, "IT Support")));
        assert!(!filter.matches(&entry(QueueStatus::Waiting, "Library")));
    }

    #[test]
    fn view_flattens_record_fields() {
        let view = QueueEntryView {
            entry: entry(QueueStatus::Waiting, "IT Support"),
            position: Some(2),
            estimated_wait_time: Some(30),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["studentName"], "Alice");
        assert_eq!(json["position"], 2);
        assert_eq!(json["estimatedWaitTime"], 30);
        assert_eq!(json["status"], "Waiting");
    }

    #[test]
    fn secrets_are_redacted_from_debug() {
        let now = Utc::now();
        let account = UserAccount {
            id: UserId::new(),
            email: String::from("alice@uni.example"),
            password_hash: String::from("$argon2id$secret-hash"),
            role: Role::Student,
            created_at: now,
        };
        let session = Session {
            token: String::from("bearer-secret"),
            user_id: account.id,
            email: account.email.clone(),
            role: account.role,
            issued_at: now,
            expires_at: now + chrono::Duration::hours(1),
        };
        assert!(!format!("{account:?}").contains("secret-hash"));
        assert!(!format!("{session:?}").contains("bearer-secret"));
    }

    #[test]
    fn session_expires_at_boundary() {
        let now = Utc::now();
        let session = Session {
            token: String::from("t"),
            user_id: UserId::new(),
            email: String::from("alice@uni.example"),
            role: Role::Student,
            issued_at: now,
            expires_at: now + chrono::Duration::hours(1),
        };
        assert!(session.is_live(now));
        assert!(!session.is_live(session.expires_at));
    }
}
