//! Shared type definitions for the Queueless campus service desk.
//!
//! This crate is the single source of truth for the records, views, and
//! request payloads that cross crate boundaries. Types flow downstream to
//! `TypeScript` via `ts-rs` for the student page and the staff dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entry, appointment, and user ids
//! - [`enums`] -- Queue and appointment statuses, caller roles
//! - [`structs`] -- Stored records, derived read views, accounts
//! - [`requests`] -- Request bodies, sanitization, and field validation

pub mod enums;
pub mod ids;
pub mod requests;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AppointmentStatus, QueueStatus, Role, UnknownStatus};
pub use ids::{AppointmentId, QueueEntryId, UserId};
pub use requests::{
    AppointmentPatch, JoinQueueRequest, LoginRequest, NewAppointmentRequest, SignupRequest,
    StatusUpdateRequest, normalize_email, sanitize_text,
};
pub use structs::{
    Appointment, EntryFilter, LoginResponse, QueueEntry, QueueEntryView, QueueStats, Session,
    UserAccount, WaitTimeEstimate,
};
