use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential pair authorizing API requests.
///
/// The access token is an opaque bearer string; the core never parses it.
/// The refresh token, when present, is the only way to obtain a new access
/// token without re-authenticating. Without one, a rejected access token is
/// terminal.
///
/// # Security
///
/// Tokens must never be logged. The `Debug` implementation redacts both.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    /// Short-lived bearer token attached to authorized requests.
    pub access_token: String,
    /// Longer-lived token exchanged for new access tokens. Absent for
    /// providers that do not issue one.
    pub refresh_token: Option<String>,
    /// Access token expiry, when the server reports one (UTC).
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: None,
        }
    }

    pub fn with_expires_in(mut self, expires_in_secs: i64) -> Self {
        self.expires_at = Some(Utc::now() + chrono::Duration::seconds(expires_in_secs));
        self
    }

    /// Whether renewal can even be attempted for this credential.
    pub fn is_renewable(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Whether the access token is past its reported expiry at `now`.
    ///
    /// Returns `false` when the server never reported an expiry; expiry is
    /// then only discoverable through a 401.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Login payload: `{identifier, password}`-shaped input for the login
/// endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration payload for the signup endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub nin: String,
}

/// Basic profile fields returned alongside a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Response shape shared by the login and signup endpoints.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Access token. Empty when the endpoint did not issue a credential
    /// (e.g. signup flows requiring email verification first).
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl AuthResponse {
    /// Convert into a storable credential, if the response carried one.
    pub fn credential(&self) -> Option<Credential> {
        if self.token.is_empty() {
            None
        } else {
            Some(Credential::new(
                self.token.clone(),
                self.refresh_token.clone(),
            ))
        }
    }
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("user", &self.user)
            .finish()
    }
}
