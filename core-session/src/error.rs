use thiserror::Error;

/// Closed error taxonomy for session operations.
///
/// Callers match on the variant; status codes and wire payloads never leak
/// past the gateway.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid credentials ({attempts_remaining} attempts remaining)")]
    InvalidCredentials { attempts_remaining: u32 },

    #[error("login locked for another {remaining_seconds}s")]
    Locked { remaining_seconds: u64 },

    #[error("session expired, re-authentication required")]
    SessionExpired,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("request rejected (status {status}): {message}")]
    Validation { status: u16, message: String },

    #[error("secure storage unavailable: {0}")]
    Storage(String),

    #[error("stored credential corrupted: {0}")]
    CredentialCorrupted(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl SessionError {
    /// Whether a manual retry of the same call can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::Network(_) | SessionError::Api { .. })
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
