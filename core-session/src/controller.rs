//! Session façade.
//!
//! [`SessionController`] is the single entry point hosts use: login, signup,
//! logout, authentication checks, and the profile/account calls that ride
//! on the authorized pipeline. It composes the credential store, lockout
//! guard, renewal coordinator, and gateway built from one
//! [`SessionConfig`].

use crate::config::SessionConfig;
use crate::credential_store::CredentialStore;
use crate::error::{Result, SessionError};
use crate::events::{EventBus, Receiver, SessionEvent};
use crate::gateway::{ApiGateway, ApiRequest};
use crate::lockout::{LockoutGuard, LockoutStatus};
use crate::renewal::RenewalCoordinator;
use crate::types::{AuthResponse, LoginRequest, SignupRequest, UserProfile};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Façade over the authentication-session core.
pub struct SessionController {
    gateway: ApiGateway,
    credential_store: CredentialStore,
    lockout: LockoutGuard,
    event_bus: EventBus,
}

impl SessionController {
    /// Wire the core from a validated configuration.
    pub fn new(config: SessionConfig) -> Self {
        let credential_store = CredentialStore::new(Arc::clone(&config.secure_store));
        let event_bus = EventBus::default();
        let renewal = RenewalCoordinator::new(
            Arc::clone(&config.http_client),
            credential_store.clone(),
            event_bus.clone(),
            config.api_base_url.clone(),
            config.api_key.clone(),
            config.renewal_retry_limit,
        );
        let gateway = ApiGateway::new(
            Arc::clone(&config.http_client),
            credential_store.clone(),
            renewal,
            config.api_base_url.clone(),
            config.api_key.clone(),
        );
        let lockout = LockoutGuard::new(
            config.lockout_threshold,
            config.lockout_cooldown,
            Arc::clone(&config.clock),
        );

        Self {
            gateway,
            credential_store,
            lockout,
            event_bus,
        }
    }

    /// Subscribe to session state changes.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.event_bus.subscribe()
    }

    /// Authenticate with email and password.
    ///
    /// While the lockout guard is engaged this fails immediately with
    /// [`SessionError::Locked`] and no network call is made. A 401 counts
    /// against the lockout; any other failure passes through uncounted.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        if let LockoutStatus::Locked { remaining_seconds } = self.lockout.status() {
            debug!(remaining_seconds, "login rejected while locked");
            return Err(SessionError::Locked { remaining_seconds });
        }

        let payload = json!({
            "email": request.email.trim(),
            "password": request.password,
        });
        let api_request = ApiRequest::post("/login").json(&payload)?;

        // 401 here means bad credentials, not a stale session, so the
        // renewal pipeline is bypassed.
        let response = self.gateway.send_once(&api_request).await?;

        if response.is_unauthorized() {
            return Err(self.count_login_failure());
        }
        if !response.is_success() {
            return Err(ApiGateway::classify_failure(&response));
        }

        let auth: AuthResponse = response
            .json()
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.store_credential_from(&auth).await?;
        self.lockout.record_success();

        info!("login succeeded");
        let _ = self.event_bus.emit(SessionEvent::SignedIn {
            user_id: auth.user.as_ref().map(|user| user.id.clone()),
        });
        Ok(auth)
    }

    /// Register a new account.
    ///
    /// When the endpoint returns a credential the session is populated
    /// immediately. Signup never interacts with the lockout guard.
    #[instrument(skip(self, request))]
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse> {
        let payload = json!({
            "name": request.name.trim(),
            "email": request.email.trim(),
            "password": request.password,
            "phone_number": request.phone_number.trim(),
            "nin": request.nin.trim(),
        });
        let api_request = ApiRequest::post("/").json(&payload)?;

        let response = self.gateway.send(&api_request).await?;
        let auth: AuthResponse = response
            .json()
            .map_err(|e| SessionError::Serialization(e.to_string()))?;

        if self.store_credential_from(&auth).await? {
            info!("signup succeeded with immediate session");
            let _ = self.event_bus.emit(SessionEvent::SignedIn {
                user_id: auth.user.as_ref().map(|user| user.id.clone()),
            });
        } else {
            info!("signup succeeded, no credential issued");
        }
        Ok(auth)
    }

    /// End the session.
    ///
    /// The server-side invalidation call is best-effort; the local
    /// credential is cleared unconditionally so no stale session survives a
    /// failed logout call.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        match self.gateway.send_once(&ApiRequest::post("/logout")).await {
            Ok(response) if !response.is_success() => {
                warn!(
                    status = response.status,
                    "server-side logout failed, clearing local session anyway"
                );
            }
            Err(e) => {
                warn!(error = %e, "server-side logout unreachable, clearing local session anyway");
            }
            Ok(_) => {}
        }

        self.credential_store.clear().await?;
        let _ = self.event_bus.emit(SessionEvent::SignedOut);
        info!("logged out");
        Ok(())
    }

    /// Whether a credential is currently stored. Pure local read, never a
    /// network call.
    pub async fn is_authenticated(&self) -> Result<bool> {
        self.credential_store.is_present().await
    }

    /// Fetch the authenticated user's profile through the authorized
    /// pipeline (renew-and-replay applies).
    pub async fn current_user(&self) -> Result<UserProfile> {
        let response = self.gateway.send(&ApiRequest::get("/me")).await?;
        response
            .json()
            .map_err(|e| SessionError::Serialization(e.to_string()))
    }

    /// Confirm an email address with the token from the verification mail.
    pub async fn verify_email(&self, token: &str) -> Result<()> {
        self.fire_and_forget("/verify-email", json!({ "token": token }))
            .await
    }

    /// Ask the server to mail a password-reset token.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        self.fire_and_forget(
            "/request-password-reset",
            json!({ "email": email.trim() }),
        )
        .await
    }

    /// Set a new password using a reset token.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        self.fire_and_forget(
            "/reset-password",
            json!({ "token": token, "new_password": new_password }),
        )
        .await
    }

    /// Record a failed login and translate the resulting lockout state.
    fn count_login_failure(&self) -> SessionError {
        match self.lockout.record_failure() {
            LockoutStatus::Locked { remaining_seconds } => {
                let _ = self
                    .event_bus
                    .emit(SessionEvent::LockedOut { remaining_seconds });
                // The attempt that crossed the threshold still reports
                // invalid credentials; the next attempt observes Locked.
                SessionError::InvalidCredentials {
                    attempts_remaining: 0,
                }
            }
            LockoutStatus::Open { attempts_remaining } => {
                SessionError::InvalidCredentials { attempts_remaining }
            }
        }
    }

    /// Persist the credential carried by `auth`, if any. Returns whether a
    /// credential was stored.
    async fn store_credential_from(&self, auth: &AuthResponse) -> Result<bool> {
        match auth.credential() {
            Some(credential) => {
                self.credential_store.save(&credential).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Unauthenticated call outside the renewal loop; non-2xx classifies
    /// through the shared taxonomy.
    async fn fire_and_forget(&self, path: &str, payload: serde_json::Value) -> Result<()> {
        let api_request = ApiRequest::post(path).json(&payload)?;
        let response = self.gateway.send_once(&api_request).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(ApiGateway::classify_failure(&response))
        }
    }
}
