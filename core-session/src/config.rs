//! Session core configuration.
//!
//! A [`SessionConfig`] holds every dependency and tunable the core needs:
//! the remote API address and key, lockout shaping, the renewal retry bound,
//! and the injected host bridges. The builder validates fail-fast so a
//! misconfigured host errors at startup, not on the first login.
//!
//! ## Usage
//!
//! ```ignore
//! use core_session::config::SessionConfig;
//! use std::sync::Arc;
//!
//! let config = SessionConfig::builder()
//!     .api_base_url("https://nvc-api.onrender.com/users")
//!     .api_key("public-api-key")
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MySecureStore))
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! [`SessionConfigBuilder::from_env`] layers these variables over whatever
//! the builder already holds:
//!
//! | Variable                    | Field                 |
//! |-----------------------------|-----------------------|
//! | `NVC_API_BASE_URL`          | `api_base_url`        |
//! | `NVC_API_KEY`               | `api_key`             |
//! | `NVC_LOCKOUT_THRESHOLD`     | `lockout_threshold`   |
//! | `NVC_LOCKOUT_COOLDOWN_SECS` | `lockout_cooldown`    |
//! | `NVC_RENEWAL_RETRY_LIMIT`   | `renewal_retry_limit` |

use crate::error::{Result, SessionError};
use bridge_traits::{Clock, HttpClient, SecureStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Consecutive login failures before the cooldown engages.
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 3;

/// Cooldown imposed once the threshold is crossed.
pub const DEFAULT_LOCKOUT_COOLDOWN: Duration = Duration::from_secs(30);

/// Automatic renewal re-attempts after a transient failure.
pub const DEFAULT_RENEWAL_RETRY_LIMIT: u32 = 1;

/// Validated configuration for [`SessionController`](crate::SessionController).
#[derive(Clone)]
pub struct SessionConfig {
    /// Base URL of the identity API, without a trailing slash.
    pub api_base_url: String,
    /// Static API key attached to every outbound call (`x-api-key`).
    pub api_key: String,
    /// Consecutive login failures before lockout.
    pub lockout_threshold: u32,
    /// Lockout cooldown duration.
    pub lockout_cooldown: Duration,
    /// Automatic retries of a failed renewal before declaring it fatal.
    pub renewal_retry_limit: u32,
    /// Host HTTP transport.
    pub http_client: Arc<dyn HttpClient>,
    /// Host durable secret storage.
    pub secure_store: Arc<dyn SecureStore>,
    /// Time source; [`SystemClock`] unless a test injects its own.
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key)
            .field("lockout_threshold", &self.lockout_threshold)
            .field("lockout_cooldown", &self.lockout_cooldown)
            .field("renewal_retry_limit", &self.renewal_retry_limit)
            .field("http_client", &"<dyn HttpClient>")
            .field("secure_store", &"<dyn SecureStore>")
            .field("clock", &"<dyn Clock>")
            .finish()
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for [`SessionConfig`].
#[derive(Default)]
pub struct SessionConfigBuilder {
    api_base_url: Option<String>,
    api_key: Option<String>,
    lockout_threshold: Option<u32>,
    lockout_cooldown: Option<Duration>,
    renewal_retry_limit: Option<u32>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SessionConfigBuilder {
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn lockout_threshold(mut self, threshold: u32) -> Self {
        self.lockout_threshold = Some(threshold);
        self
    }

    pub fn lockout_cooldown(mut self, cooldown: Duration) -> Self {
        self.lockout_cooldown = Some(cooldown);
        self
    }

    pub fn renewal_retry_limit(mut self, limit: u32) -> Self {
        self.renewal_retry_limit = Some(limit);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Layer environment variables over the current builder state.
    ///
    /// Unset or unparseable variables leave the existing value untouched.
    pub fn from_env(mut self) -> Self {
        if let Ok(url) = std::env::var("NVC_API_BASE_URL") {
            self.api_base_url = Some(url);
        }
        if let Ok(key) = std::env::var("NVC_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(threshold) = env_parse::<u32>("NVC_LOCKOUT_THRESHOLD") {
            self.lockout_threshold = Some(threshold);
        }
        if let Some(secs) = env_parse::<u64>("NVC_LOCKOUT_COOLDOWN_SECS") {
            self.lockout_cooldown = Some(Duration::from_secs(secs));
        }
        if let Some(limit) = env_parse::<u32>("NVC_RENEWAL_RETRY_LIMIT") {
            self.renewal_retry_limit = Some(limit);
        }
        self
    }

    /// Validate and assemble the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] when a required field is
    /// missing or nonsensical (empty base URL, zero lockout threshold).
    pub fn build(self) -> Result<SessionConfig> {
        let api_base_url = self
            .api_base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| missing("api_base_url", "set NVC_API_BASE_URL or call api_base_url()"))?
            .trim_end_matches('/')
            .to_string();

        let api_key = self
            .api_key
            .ok_or_else(|| missing("api_key", "set NVC_API_KEY or call api_key()"))?;

        let http_client = self.http_client.ok_or_else(|| {
            missing(
                "http_client",
                "inject the host HTTP transport via http_client()",
            )
        })?;

        let secure_store = self.secure_store.ok_or_else(|| {
            missing(
                "secure_store",
                "inject the host secure storage via secure_store()",
            )
        })?;

        let lockout_threshold = self.lockout_threshold.unwrap_or(DEFAULT_LOCKOUT_THRESHOLD);
        if lockout_threshold == 0 {
            return Err(SessionError::Configuration(
                "lockout_threshold must be at least 1".to_string(),
            ));
        }

        Ok(SessionConfig {
            api_base_url,
            api_key,
            lockout_threshold,
            lockout_cooldown: self.lockout_cooldown.unwrap_or(DEFAULT_LOCKOUT_COOLDOWN),
            renewal_retry_limit: self
                .renewal_retry_limit
                .unwrap_or(DEFAULT_RENEWAL_RETRY_LIMIT),
            http_client,
            secure_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

fn missing(field: &str, hint: &str) -> SessionError {
    SessionError::Configuration(format!("missing {field}: {hint}"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(variable = name, value = %raw, "ignoring unparseable environment override");
                None
            }
        },
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse};

    struct NoopHttpClient;

    #[async_trait::async_trait]
    impl HttpClient for NoopHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable(
                "no transport in config tests".to_string(),
            ))
        }
    }

    struct NoopSecureStore;

    #[async_trait::async_trait]
    impl SecureStore for NoopSecureStore {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_secret(&self, _key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn base_builder() -> SessionConfigBuilder {
        SessionConfig::builder()
            .api_base_url("https://api.example.com/users/")
            .api_key("k")
            .http_client(Arc::new(NoopHttpClient))
            .secure_store(Arc::new(NoopSecureStore))
    }

    #[test]
    fn build_applies_defaults_and_trims_trailing_slash() {
        let config = base_builder().build().unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com/users");
        assert_eq!(config.lockout_threshold, DEFAULT_LOCKOUT_THRESHOLD);
        assert_eq!(config.lockout_cooldown, DEFAULT_LOCKOUT_COOLDOWN);
        assert_eq!(config.renewal_retry_limit, DEFAULT_RENEWAL_RETRY_LIMIT);
    }

    #[test]
    fn build_fails_without_transport() {
        let result = SessionConfig::builder()
            .api_base_url("https://api.example.com")
            .api_key("k")
            .secure_store(Arc::new(NoopSecureStore))
            .build();

        match result {
            Err(SessionError::Configuration(message)) => {
                assert!(message.contains("http_client"));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn build_rejects_zero_threshold() {
        let result = base_builder().lockout_threshold(0).build();
        assert!(matches!(result, Err(SessionError::Configuration(_))));
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = base_builder()
            .lockout_threshold(5)
            .lockout_cooldown(Duration::from_secs(60))
            .renewal_retry_limit(2)
            .build()
            .unwrap();

        assert_eq!(config.lockout_threshold, 5);
        assert_eq!(config.lockout_cooldown, Duration::from_secs(60));
        assert_eq!(config.renewal_retry_limit, 2);
    }
}
