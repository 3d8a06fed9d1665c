//! Injectable Time Source
//!
//! Lockout expiry and credential expiry are both judged against "now".
//! Abstracting the clock lets tests drive those timelines deterministically
//! instead of sleeping through real cooldowns.

use chrono::{DateTime, Utc};

/// Time source trait.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Current Unix timestamp in seconds.
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let a = clock.unix_timestamp();
        assert!(a > 0);
        assert!(clock.now().timestamp() >= a);
    }
}
