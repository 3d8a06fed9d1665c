//! Login attempt lockout.
//!
//! Purely local bookkeeping: counts consecutive failed logins and imposes a
//! timed cooldown once the configured threshold is crossed. Never touches
//! the network, never persists. The record lives for one lockout window.
//!
//! State machine: `Open -> (failure x threshold) -> Locked -> (cooldown
//! elapses) -> Open`. Expiry is lazy: the transition back to Open happens on
//! the next check, so no background timer is needed for correctness.

use bridge_traits::Clock;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Observable guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutStatus {
    /// Logins allowed; `attempts_remaining` failures left before lockout.
    Open { attempts_remaining: u32 },
    /// Logins suspended for another `remaining_seconds`.
    Locked { remaining_seconds: u64 },
}

impl LockoutStatus {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockoutStatus::Locked { .. })
    }
}

#[derive(Debug, Default)]
struct AttemptRecord {
    consecutive_failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

/// Tracks consecutive failed logins and imposes the cooldown.
///
/// Mutations are atomic under the internal mutex, so rapid double-submits
/// cannot skip or double-count a failure.
pub struct LockoutGuard {
    threshold: u32,
    cooldown: chrono::Duration,
    clock: Arc<dyn Clock>,
    record: Mutex<AttemptRecord>,
}

impl LockoutGuard {
    /// `threshold` is the number of consecutive failures that triggers the
    /// `cooldown`. Callers validate `threshold >= 1` (the config builder
    /// does).
    pub fn new(threshold: u32, cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            threshold,
            cooldown: chrono::Duration::from_std(cooldown)
                .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000)),
            clock,
            record: Mutex::new(AttemptRecord::default()),
        }
    }

    /// Record one failed login attempt and return the resulting state.
    ///
    /// Crossing the threshold sets the lock; further failures while locked
    /// do not extend it.
    pub fn record_failure(&self) -> LockoutStatus {
        let now = self.clock.now();
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        Self::expire_if_elapsed(&mut record, now);

        record.consecutive_failures += 1;
        if record.consecutive_failures >= self.threshold && record.locked_until.is_none() {
            let until = now + self.cooldown;
            record.locked_until = Some(until);
            warn!(
                consecutive_failures = record.consecutive_failures,
                cooldown_seconds = self.cooldown.num_seconds(),
                "lockout threshold crossed, suspending login attempts"
            );
        } else {
            debug!(
                consecutive_failures = record.consecutive_failures,
                "login failure recorded"
            );
        }

        self.status_of(&record, now)
    }

    /// Reset the failure counter and clear any lock.
    pub fn record_success(&self) {
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        *record = AttemptRecord::default();
    }

    /// Current state, applying lazy expiry.
    pub fn status(&self) -> LockoutStatus {
        let now = self.clock.now();
        let mut record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        Self::expire_if_elapsed(&mut record, now);
        self.status_of(&record, now)
    }

    fn expire_if_elapsed(record: &mut AttemptRecord, now: DateTime<Utc>) {
        if let Some(until) = record.locked_until {
            if now >= until {
                debug!("lockout window elapsed, reopening");
                *record = AttemptRecord::default();
            }
        }
    }

    fn status_of(&self, record: &AttemptRecord, now: DateTime<Utc>) -> LockoutStatus {
        match record.locked_until {
            Some(until) if now < until => LockoutStatus::Locked {
                remaining_seconds: remaining_seconds(until, now),
            },
            _ => LockoutStatus::Open {
                attempts_remaining: self.threshold.saturating_sub(record.consecutive_failures),
            },
        }
    }
}

/// Seconds until `until`, rounded up so a freshly set lock reports the full
/// cooldown and a nearly elapsed one still reports 1.
fn remaining_seconds(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (until - now).num_milliseconds().max(0);
    ((millis + 999) / 1000) as u64
}
