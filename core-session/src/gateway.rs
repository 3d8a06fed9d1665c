//! Authorized request dispatch with transparent renewal-and-replay.
//!
//! The gateway owns the request side of the session: it attaches the static
//! API key and the stored bearer credential, executes through the host
//! transport, and classifies failures into the session taxonomy. A 401 on
//! an authorized call triggers exactly one renewal cycle through
//! [`RenewalCoordinator`] followed by exactly one replay, never a loop.

use crate::credential_store::CredentialStore;
use crate::error::{Result, SessionError};
use crate::renewal::{RenewalCoordinator, RenewalOutcome};
use bridge_traits::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// A replayable API call descriptor.
///
/// The body is held as a JSON value rather than serialized bytes so a
/// renewal replay rebuilds the identical request from scratch.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: None,
        }
    }

    pub fn json(mut self, body: impl serde::Serialize) -> Result<Self> {
        self.body = Some(
            serde_json::to_value(body).map_err(|e| SessionError::Serialization(e.to_string()))?,
        );
        Ok(self)
    }
}

/// Error payload shape of the remote API.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Issues authorized requests and drives renewal plus replay.
///
/// Cheap to clone; clones share the credential store and coordinator.
#[derive(Clone)]
pub struct ApiGateway {
    http_client: Arc<dyn HttpClient>,
    credential_store: CredentialStore,
    renewal: RenewalCoordinator,
    api_base_url: String,
    api_key: String,
}

impl ApiGateway {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credential_store: CredentialStore,
        renewal: RenewalCoordinator,
        api_base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            credential_store,
            renewal,
            api_base_url: api_base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Execute an authorized call with the full renewal pipeline.
    ///
    /// On 401: renew once via the coordinator, replay once with the fresh
    /// credential. A replay 401 or a failed renewal surfaces
    /// [`SessionError::SessionExpired`]. Every other failure class is
    /// surfaced as-is and never triggers renewal.
    pub async fn send(&self, request: &ApiRequest) -> Result<HttpResponse> {
        let response = self.dispatch(request).await?;
        if !response.is_unauthorized() {
            return classify(response);
        }

        debug!(path = %request.path, "request unauthorized, renewing credential");
        match self.renewal.renew().await {
            RenewalOutcome::Renewed => {
                let replay = self.dispatch(request).await?;
                if replay.is_unauthorized() {
                    warn!(path = %request.path, "replayed request still unauthorized");
                    return Err(SessionError::SessionExpired);
                }
                classify(replay)
            }
            RenewalOutcome::Failed => Err(SessionError::SessionExpired),
        }
    }

    /// Execute one exchange without the renewal pipeline.
    ///
    /// Used for calls whose 401 means something other than "stale
    /// credential" (login) and for fire-and-forget calls (logout,
    /// registration-adjacent endpoints). Only transport failures become
    /// errors; every completed response is returned for the caller to
    /// interpret.
    pub async fn send_once(&self, request: &ApiRequest) -> Result<HttpResponse> {
        self.dispatch(request).await
    }

    /// Map a completed non-2xx response into the taxonomy. Public to the
    /// crate so the controller classifies `send_once` responses uniformly.
    pub(crate) fn classify_failure(response: &HttpResponse) -> SessionError {
        let message = error_detail(response);
        match response.status {
            400 | 422 => SessionError::Validation {
                status: response.status,
                message,
            },
            status => SessionError::Api { status, message },
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<HttpResponse> {
        let mut http = HttpRequest::new(
            request.method,
            format!("{}{}", self.api_base_url, request.path),
        )
        .header("x-api-key", self.api_key.clone());

        if let Some(body) = &request.body {
            http = http
                .json(body)
                .map_err(|e| SessionError::Serialization(e.to_string()))?;
        }

        if let Some(credential) = self.credential_store.load().await? {
            http = http.bearer(credential.access_token);
        }

        self.http_client.execute(http).await.map_err(|e| {
            warn!(path = %request.path, error = %e, "transport failure");
            SessionError::Network(e.to_string())
        })
    }
}

fn classify(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiGateway::classify_failure(&response))
    }
}

/// Best-effort extraction of the server's error message.
fn error_detail(response: &HttpResponse) -> String {
    match response.json::<ErrorBody>() {
        Ok(body) => body
            .detail
            .or(body.message)
            .unwrap_or_else(|| "request failed".to_string()),
        Err(_) => "request failed".to_string(),
    }
}
