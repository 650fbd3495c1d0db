//! Queue logic for the Queueless campus service desk.
//!
//! Students join a virtual line instead of standing in a physical one.
//! This crate decides where each of them stands and how long they will
//! wait. Nothing derived is ever persisted: positions are recomputed from
//! the entry store on every read, so a change to one entry shifts
//! everyone behind it without touching their records.
//!
//! # Modules
//!
//! - [`position`] -- [`PositionEngine`], the pure position and wait
//!   computation.
//! - [`lifecycle`] -- [`QueueManager`]: join, status transition, leave.
//! - [`projector`] -- [`StatusProjector`]: entry, roster, wait-time estimate,
//!   and dashboard stats.
//! - [`appointments`] -- [`AppointmentService`] for scheduled visits.
//! - [`accounts`] -- [`AccountService`]: signup, login, and token lookup.
//! - [`config`] -- Layered configuration for the whole service.
//! - [`error`] -- [`QueueError`].
//!
//! [`PositionEngine`]: position::PositionEngine
//! [`QueueManager`]: lifecycle::QueueManager
//! [`StatusProjector`]: projector::StatusProjector
//! [`AppointmentService`]: appointments::AppointmentService
//! [`AccountService`]: accounts::AccountService
//! [`QueueError`]: error::QueueError

pub mod accounts;
pub mod appointments;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod position;
pub mod projector;

pub use accounts::AccountService;
pub use appointments::AppointmentService;
pub use config::{AppConfig, AuthConfig, ConfigError, Grouping, QueueConfig, Role, TokenGrant};
pub use error::QueueError;
pub use lifecycle::QueueManager;
pub use position::{Placement, PositionEngine};
pub use projector::StatusProjector;
