//! Failed-authentication attempt limiter.
//!
//! Tracks rejected credentials per client identity. Every attempt first
//! calls [`AttemptTracker::acquire`], which checks the lockout and counts
//! the attempt under the same lock, so a burst of concurrent requests can
//! never get more than `max_attempts` credentials evaluated. The caller
//! then settles the attempt:
//!
//! - [`AttemptTracker::record_failure`] keeps it counted and locks the
//!   client once the limit is reached
//! - [`AttemptTracker::release`] refunds it (accepted bearer token, or no
//!   credential presented at all)
//! - [`AttemptTracker::record_success`] forgets the client entirely
//!   (successful login)
//!
//! A locked client gets 429 until the lockout lifts. Records idle for
//! longer than the window are evicted by [`AttemptTracker::evict_expired`],
//! which the server calls on a timer.
//!
//! State is process-local: running more than one instance behind a load
//! balancer gives each instance its own counters.
//!
//! Every method takes `now` explicitly so the timing rules are testable
//! without sleeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use queueless_core::config::RateLimitConfig;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Per-client attempt record.
#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    /// Attempts counted in the current window, including ones in flight.
    attempts: u32,
    last_attempt: Instant,
    locked_until: Option<Instant>,
}

impl AttemptRecord {
    const fn fresh(now: Instant) -> Self {
        Self {
            attempts: 0,
            last_attempt: now,
            locked_until: None,
        }
    }
}

/// What a client has left, for the `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptStatus {
    /// Attempts allowed per window.
    pub limit: u32,
    /// Attempts left before lockout.
    pub remaining: u32,
    /// Time until the window (or an active lockout) ends.
    pub reset_after: Duration,
}

/// Time-bounded map of authentication attempts.
#[derive(Debug)]
pub struct AttemptTracker {
    max_attempts: u32,
    window: Duration,
    lockout: Duration,
    records: Mutex<HashMap<String, AttemptRecord>>,
}

impl AttemptTracker {
    /// Create a tracker from the rate limit config section.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window: Duration::from_secs(config.window_secs),
            lockout: Duration::from_secs(config.lockout_secs),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// The eviction window.
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Admit and count one attempt, or `Err(remaining)` while `client` is
    /// locked out.
    ///
    /// An expired lockout is cleared here, giving the client a fresh set
    /// of attempts. A client whose in-flight and failed attempts already
    /// fill the window is locked on the spot.
    pub async fn acquire(&self, client: &str, now: Instant) -> Result<(), Duration> {
        let mut records = self.records.lock().await;
        let record = records
            .entry(client.to_owned())
            .or_insert_with(|| AttemptRecord::fresh(now));

        if let Some(locked_until) = record.locked_until {
            if now < locked_until {
                return Err(locked_until.saturating_duration_since(now));
            }
            *record = AttemptRecord::fresh(now);
        }
        if now.saturating_duration_since(record.last_attempt) >= self.window {
            record.attempts = 0;
        }
        if record.attempts >= self.max_attempts {
            record.locked_until = Some(now.checked_add(self.lockout).unwrap_or(now));
            warn!(
                client,
                attempts = record.attempts,
                lockout_secs = self.lockout.as_secs(),
                "Client locked out while attempts were still in flight"
            );
            return Err(self.lockout);
        }

        record.attempts = record.attempts.saturating_add(1);
        record.last_attempt = now;
        Ok(())
    }

    /// Settle an acquired attempt as failed. Returns the lockout length
    /// when this failure triggers a lockout.
    pub async fn record_failure(&self, client: &str, now: Instant) -> Option<Duration> {
        let mut records = self.records.lock().await;
        // Evicted between acquire and settle: count it afresh.
        let record = records.entry(client.to_owned()).or_insert(AttemptRecord {
            attempts: 1,
            last_attempt: now,
            locked_until: None,
        });
        record.last_attempt = now;

        if record.attempts >= self.max_attempts && record.locked_until.is_none() {
            record.locked_until = Some(now.checked_add(self.lockout).unwrap_or(now));
            warn!(
                client,
                attempts = record.attempts,
                lockout_secs = self.lockout.as_secs(),
                "Client locked out after repeated authentication failures"
            );
            Some(self.lockout)
        } else {
            None
        }
    }

    /// Refund an acquired attempt that should not count.
    pub async fn release(&self, client: &str) {
        let mut records = self.records.lock().await;
        if let Some(record) = records.get_mut(client) {
            record.attempts = record.attempts.saturating_sub(1);
            if record.attempts == 0 && record.locked_until.is_none() {
                records.remove(client);
            }
        }
    }

    /// Forget `client` after a successful login.
    pub async fn record_success(&self, client: &str) {
        self.records.lock().await.remove(client);
    }

    /// Remaining budget for `client` at `now`.
    pub async fn status(&self, client: &str, now: Instant) -> AttemptStatus {
        let records = self.records.lock().await;
        let Some(record) = records.get(client) else {
            return AttemptStatus {
                limit: self.max_attempts,
                remaining: self.max_attempts,
                reset_after: self.window,
            };
        };

        if let Some(locked_until) = record.locked_until.filter(|until| now < *until) {
            return AttemptStatus {
                limit: self.max_attempts,
                remaining: 0,
                reset_after: locked_until.saturating_duration_since(now),
            };
        }
        let idle = now.saturating_duration_since(record.last_attempt);
        let attempts = if idle >= self.window {
            0
        } else {
            record.attempts
        };
        AttemptStatus {
            limit: self.max_attempts,
            remaining: self.max_attempts.saturating_sub(attempts),
            reset_after: self.window.saturating_sub(idle),
        }
    }

    /// Drop records that are neither locked nor recently active. Returns
    /// how many were removed.
    pub async fn evict_expired(&self, now: Instant) -> usize {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| {
            let locked = record.locked_until.is_some_and(|until| now < until);
            let recent = now.saturating_duration_since(record.last_attempt) < self.window;
            locked || recent
        });
        let evicted = before.saturating_sub(records.len());
        if evicted > 0 {
            debug!(evicted, remaining = records.len(), "Evicted idle attempt records");
        }
        evicted
    }

    /// Number of clients currently tracked.
    pub async fn tracked(&self) -> usize {
        self.records.lock().await.len()
    }
}

/// Whole seconds until `remaining` elapses, rounded up.
pub const fn retry_after_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}
