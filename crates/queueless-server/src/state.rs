//! Shared application state for the HTTP server.
//!
//! [`AppState`] holds one instance of each queue component, all over the
//! same [`EntryStore`], plus the account service, auth gate, and attempt
//! limiter. Handlers receive it as `State<Arc<AppState>>`.

use std::time::Duration;

use queueless_core::config::AppConfig;
use queueless_core::{
    AccountService, AppointmentService, PositionEngine, QueueError, QueueManager, StatusProjector,
};
use queueless_db::EntryStore;

use crate::auth::AuthGate;
use crate::rate_limit::AttemptTracker;

/// Everything a request handler needs.
#[derive(Debug)]
pub struct AppState {
    /// The single source of truth.
    pub store: EntryStore,
    /// Join, transition, and leave.
    pub queue: QueueManager,
    /// Every queue read.
    pub projector: StatusProjector,
    /// Appointment CRUD.
    pub appointments: AppointmentService,
    /// Signup, login, and login-token lookup.
    pub accounts: AccountService,
    /// Static bearer-token grants.
    pub auth: AuthGate,
    /// Failed-authentication lockouts.
    pub limiter: AttemptTracker,
    /// Key attempt tracking on `X-Forwarded-For` instead of the peer.
    pub trust_forwarded_for: bool,
    /// Pause before answering a failed login.
    pub login_failure_delay: Duration,
}

impl AppState {
    /// Wire every component to `store` using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Internal`] if the password hashing cost in
    /// `config` is unusable.
    pub fn new(store: EntryStore, config: &AppConfig) -> Result<Self, QueueError> {
        Ok(Self {
            queue: QueueManager::new(store.clone(), &config.queue),
            projector: StatusProjector::new(
                store.clone(),
                PositionEngine::from_config(&config.queue),
            ),
            appointments: AppointmentService::new(store.clone()),
            accounts: AccountService::new(store.clone(), &config.auth)?,
            auth: AuthGate::from_config(&config.auth),
            limiter: AttemptTracker::new(&config.rate_limit),
            trust_forwarded_for: config.server.trust_forwarded_for,
            login_failure_delay: Duration::from_millis(config.auth.login_failure_delay_ms),
            store,
        })
    }

    /// Default policy over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Same as [`AppState::new`].
    pub fn in_memory() -> Result<Self, QueueError> {
        Self::new(EntryStore::in_memory(), &AppConfig::default())
    }
}
