//! HTTP API server for the Queueless campus service desk.
//!
//! Exposes the virtual queue and appointment booking over a JSON REST
//! API. Students and staff sign up and log in for a bearer token.
//! Students join the queue, check their live position, and leave; staff
//! see the roster and dashboard counters and move entries through their
//! statuses.
//!
//! # Architecture
//!
//! Handlers are thin: they authenticate, parse, and delegate to the
//! components in `queueless-core`, which read and write through one
//! shared [`EntryStore`]. No handler caches a position or wait time.
//!
//! # Modules
//!
//! - [`router`] -- [`build_router`] wiring every route
//! - [`handlers`] -- Queue endpoints and the health check
//! - [`appointments`] -- Appointment endpoints
//! - [`accounts`] -- Signup, login, and profile endpoints
//! - [`auth`] -- Bearer-token extractors and role gating
//! - [`rate_limit`] -- Failed-authentication lockouts
//! - [`state`] -- [`AppState`]
//! - [`server`] -- [`start_server`] and graceful shutdown
//! - [`error`] -- [`ApiError`] and its JSON rendering
//!
//! [`EntryStore`]: queueless_db::EntryStore

pub mod accounts;
pub mod appointments;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
