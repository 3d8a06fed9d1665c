//! Logging setup.
//!
//! Thin wrapper over `tracing-subscriber` so hosts get structured session
//! logs with one call. Filtering follows `RUST_LOG` when set, otherwise the
//! `default_filter` passed in.
//!
//! Token material never reaches the log stream: credential types redact
//! their secrets in `Debug`, and session modules log identifiers, statuses,
//! and durations only.
//!
//! ## Usage
//!
//! ```ignore
//! core_session::logging::init_logging("core_session=debug")?;
//! tracing::info!("session core ready");
//! ```

use crate::error::{Result, SessionError};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber is already installed, so hosts that manage
/// their own `tracing` setup should skip this and let the session core's
/// spans flow into their subscriber instead.
pub fn init_logging(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| SessionError::Configuration(format!("invalid log filter: {e}")))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| SessionError::Configuration(format!("logging already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails_instead_of_panicking() {
        // Whichever call wins the global slot, the loser must surface a
        // configuration error rather than abort the process.
        let _ = init_logging("core_session=info");
        let second = init_logging("core_session=info");
        assert!(matches!(second, Err(SessionError::Configuration(_))));
    }
}
