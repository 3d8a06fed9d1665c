//! Durable credential persistence.
//!
//! One credential pair per installation, stored through the host's
//! [`SecureStore`]. The pair is serialized as a single JSON document under
//! one key so a save is atomic: a concurrent reader sees either the old pair
//! or the new pair, never a mismatched access/refresh combination.
//!
//! The two logical slots keep the storage names the original client used
//! (`nvc_auth_token` / `nvc_refresh_token`) as field names inside the
//! document.

use crate::error::{Result, SessionError};
use crate::types::Credential;
use bridge_traits::SecureStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage key for the serialized credential document.
pub const CREDENTIAL_STORAGE_KEY: &str = "nvc_session_credential";

/// Persisted layout. Field names are the documented slot names.
#[derive(Serialize, Deserialize)]
struct StoredCredential {
    #[serde(rename = "nvc_auth_token")]
    access_token: String,
    #[serde(rename = "nvc_refresh_token")]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

/// Durable holder for the current credential pair.
///
/// A dumb, durable map: no validation of token content, no expiry logic.
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
}

impl CredentialStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("initializing credential store");
        Self { secure_store }
    }

    /// Persist `credential`, replacing any previous pair wholesale.
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let stored = StoredCredential {
            access_token: credential.access_token.clone(),
            refresh_token: credential.refresh_token.clone(),
            expires_at: credential.expires_at.map(|at| at.timestamp()),
        };

        let document = serde_json::to_vec(&stored)
            .map_err(|e| SessionError::Serialization(format!("credential encoding: {e}")))?;

        self.secure_store
            .set_secret(CREDENTIAL_STORAGE_KEY, &document)
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to persist credential");
                SessionError::Storage(e.to_string())
            })?;

        info!(
            has_refresh_token = stored.refresh_token.is_some(),
            "credential stored"
        );
        Ok(())
    }

    /// Load the stored credential pair, if any.
    ///
    /// A document that no longer deserializes is deleted and reported as
    /// [`SessionError::CredentialCorrupted`]; the next load starts clean.
    pub async fn load(&self) -> Result<Option<Credential>> {
        let document = self
            .secure_store
            .get_secret(CREDENTIAL_STORAGE_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to read credential");
                SessionError::Storage(e.to_string())
            })?;

        let Some(document) = document else {
            debug!("no credential in storage");
            return Ok(None);
        };

        let stored: StoredCredential = match serde_json::from_slice(&document) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "stored credential corrupted, deleting");
                if let Err(delete_err) = self.secure_store.delete_secret(CREDENTIAL_STORAGE_KEY).await
                {
                    warn!(error = %delete_err, "failed to delete corrupted credential");
                }
                return Err(SessionError::CredentialCorrupted(e.to_string()));
            }
        };

        let mut credential = Credential::new(stored.access_token, stored.refresh_token);
        credential.expires_at = stored
            .expires_at
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0));

        Ok(Some(credential))
    }

    /// Delete the stored pair. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        self.secure_store
            .delete_secret(CREDENTIAL_STORAGE_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to clear credential");
                SessionError::Storage(e.to_string())
            })?;

        info!("credential cleared");
        Ok(())
    }

    /// Whether a credential is currently stored, without deserializing it.
    pub async fn is_present(&self) -> Result<bool> {
        self.secure_store
            .has_secret(CREDENTIAL_STORAGE_KEY)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))
    }
}
