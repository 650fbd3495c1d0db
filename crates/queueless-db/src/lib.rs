//! Entry store for the Queueless campus service desk.
//!
//! The entry store exclusively owns persisted queue entries,
//! appointments, user accounts, and login sessions. It offers create,
//! read-by-id, read-all-matching-filter, update, and delete, and nothing
//! else: position and wait time are never stored here.
//!
//! # Backends
//!
//! ```text
//! EntryStore (enum dispatch)
//!     |
//!     +-- Memory   --> MemoryStore   (RwLock<BTreeMap>, single process)
//!     |
//!     +-- Postgres --> PostgresPool
//!         |-- QueueStore        (queue_entries)
//!         |-- AppointmentStore  (appointments)
//!         +-- AccountStore      (users, sessions)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- [`EntryStore`], the handle every caller uses
//! - [`memory`] -- In-process backend
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`queue_store`] -- Queue entry queries
//! - [`appointment_store`] -- Appointment queries
//! - [`account_store`] -- Account and session queries
//! - [`error`] -- Shared error types

pub mod account_store;
pub mod appointment_store;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod queue_store;
pub mod store;

// Re-export primary types for convenience.
pub use account_store::{AccountStore, SessionRow, UserRow};
pub use appointment_store::{AppointmentRow, AppointmentStore};
pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use queue_store::{QueueEntryRow, QueueStore};
pub use store::EntryStore;
