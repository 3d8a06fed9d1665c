//! Single-flight credential renewal.
//!
//! Multiple concurrent requests can discover an expired credential at the
//! same time. The coordinator collapses that storm into one renewal call:
//! the first caller starts it, everyone else joins the same shared future,
//! and all observe the identical outcome. A second renewal can only start
//! after the current one has fully resolved.
//!
//! The renewal future is driven by a detached task, so a caller that is
//! cancelled mid-await (UI teardown) never cancels the renewal itself; the
//! credential store always ends in a consistent state, and the discarded
//! outcome is harmless.

use crate::credential_store::CredentialStore;
use crate::error::SessionError;
use crate::events::{EventBus, SessionEvent};
use crate::types::Credential;
use bridge_traits::{HttpClient, HttpMethod, HttpRequest};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result every waiter of one renewal observes.
///
/// Binary by design: callers either replay with the new credential or treat
/// the session as expired. Failure detail is logged and published on the
/// event bus, not returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// The credential store now holds a fresh pair.
    Renewed,
    /// Renewal is impossible; the credential store has been cleared.
    Failed,
}

type SharedRenewal = Shared<BoxFuture<'static, RenewalOutcome>>;

struct InFlight {
    generation: u64,
    future: SharedRenewal,
}

struct Inner {
    http_client: Arc<dyn HttpClient>,
    credential_store: CredentialStore,
    event_bus: EventBus,
    api_base_url: String,
    api_key: String,
    retry_limit: u32,
    in_flight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
}

/// Collapses concurrent renewal demand into one network operation.
///
/// Cheap to clone; clones share the in-flight state.
#[derive(Clone)]
pub struct RenewalCoordinator {
    inner: Arc<Inner>,
}

impl RenewalCoordinator {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credential_store: CredentialStore,
        event_bus: EventBus,
        api_base_url: impl Into<String>,
        api_key: impl Into<String>,
        retry_limit: u32,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http_client,
                credential_store,
                event_bus,
                api_base_url: api_base_url.into(),
                api_key: api_key.into(),
                retry_limit,
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Renew the stored credential, joining an in-flight renewal if one
    /// exists.
    ///
    /// Exactly one renewal network operation runs per failure storm; every
    /// caller resumes only after it resolves and sees the same outcome.
    pub async fn renew(&self) -> RenewalOutcome {
        let shared = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.as_ref() {
                Some(entry) => {
                    debug!(
                        generation = entry.generation,
                        "joining in-flight credential renewal"
                    );
                    entry.future.clone()
                }
                None => {
                    let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
                    info!(generation, "starting credential renewal");

                    let future: SharedRenewal =
                        run_renewal(Arc::clone(&self.inner)).boxed().shared();
                    *in_flight = Some(InFlight {
                        generation,
                        future: future.clone(),
                    });

                    // Detached driver: completes the renewal and returns the
                    // coordinator to idle even if every caller is cancelled.
                    let inner = Arc::clone(&self.inner);
                    let driver = future.clone();
                    tokio::spawn(async move {
                        let outcome = driver.await;
                        debug!(generation, ?outcome, "credential renewal resolved");
                        let mut in_flight = inner.in_flight.lock().await;
                        if in_flight.as_ref().map(|entry| entry.generation) == Some(generation) {
                            *in_flight = None;
                        }
                    });

                    future
                }
            }
        };

        shared.await
    }
}

#[derive(Serialize)]
struct RenewalRequest {
    refresh_token: String,
}

#[derive(Deserialize)]
struct RenewalResponse {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

async fn run_renewal(inner: Arc<Inner>) -> RenewalOutcome {
    let _ = inner.event_bus.emit(SessionEvent::CredentialRenewing);

    match attempt_renewal(&inner).await {
        Ok(()) => {
            info!("credential renewed");
            let _ = inner.event_bus.emit(SessionEvent::CredentialRenewed);
            RenewalOutcome::Renewed
        }
        Err(e) => {
            warn!(error = %e, "credential renewal failed, clearing stored credential");
            if let Err(clear_err) = inner.credential_store.clear().await {
                warn!(error = %clear_err, "failed to clear credential after renewal failure");
            }
            let _ = inner.event_bus.emit(SessionEvent::RenewalFailed {
                message: e.to_string(),
            });
            RenewalOutcome::Failed
        }
    }
}

/// One renewal cycle: load the refresh credential, exchange it, store the
/// result. Transient failures (transport, 5xx) are retried up to the
/// configured bound; a 4xx rejection of the refresh credential is terminal
/// immediately.
async fn attempt_renewal(inner: &Inner) -> Result<(), SessionError> {
    let current = inner.credential_store.load().await?;
    let refresh_token = current
        .as_ref()
        .and_then(|credential| credential.refresh_token.clone())
        .ok_or_else(|| {
            debug!("no refresh credential available, renewal is terminal");
            SessionError::SessionExpired
        })?;

    let mut attempts = 0u32;
    loop {
        attempts += 1;

        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/refresh-token", inner.api_base_url),
        )
        .header("x-api-key", inner.api_key.clone())
        .json(&RenewalRequest {
            refresh_token: refresh_token.clone(),
        })
        .map_err(|e| SessionError::Serialization(e.to_string()))?;

        match inner.http_client.execute(request).await {
            Ok(response) if response.is_success() => {
                let body: RenewalResponse = response
                    .json()
                    .map_err(|e| SessionError::Serialization(e.to_string()))?;

                // The renewal response is authoritative: overwrite both
                // slots, keeping the old refresh credential only when the
                // response omits a rotated one.
                let rotated = body.refresh_token.is_some();
                let mut credential =
                    Credential::new(body.token, body.refresh_token.or(Some(refresh_token)));
                if let Some(expires_in) = body.expires_in {
                    credential = credential.with_expires_in(expires_in);
                }
                inner.credential_store.save(&credential).await?;

                debug!(rotated_refresh_token = rotated, "renewed credential stored");
                return Ok(());
            }
            Ok(response) if response.is_client_error() => {
                warn!(
                    status = response.status,
                    "refresh credential rejected by the renewal endpoint"
                );
                return Err(SessionError::SessionExpired);
            }
            Ok(response) => {
                if attempts > inner.retry_limit {
                    return Err(SessionError::Api {
                        status: response.status,
                        message: "renewal endpoint failed past the retry bound".to_string(),
                    });
                }
                warn!(
                    status = response.status,
                    attempt = attempts,
                    "renewal endpoint returned a server error, retrying"
                );
            }
            Err(e) => {
                if attempts > inner.retry_limit {
                    return Err(SessionError::Network(e.to_string()));
                }
                warn!(error = %e, attempt = attempts, "renewal transport failure, retrying");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::{HttpResponse, SecureStore};
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::watch;

    #[derive(Clone, Default)]
    struct MockSecureStore {
        entries: Arc<StdMutex<HashMap<String, Vec<u8>>>>,
    }

    #[async_trait::async_trait]
    impl SecureStore for MockSecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    /// Scripted HTTP client: pops one canned step per call and counts calls.
    /// An optional gate holds every call until the test releases it.
    struct ScriptedHttpClient {
        steps: StdMutex<Vec<BridgeResult<HttpResponse>>>,
        calls: AtomicUsize,
        gate: Option<watch::Receiver<bool>>,
    }

    impl ScriptedHttpClient {
        fn new(steps: Vec<BridgeResult<HttpResponse>>) -> Self {
            Self {
                steps: StdMutex::new(steps),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(steps: Vec<BridgeResult<HttpResponse>>) -> (Self, watch::Sender<bool>) {
            let (tx, rx) = watch::channel(false);
            (
                Self {
                    steps: StdMutex::new(steps),
                    calls: AtomicUsize::new(0),
                    gate: Some(rx),
                },
                tx,
            )
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let mut gate = gate.clone();
                while !*gate.borrow() {
                    gate.changed().await.map_err(|_| {
                        BridgeError::OperationFailed("gate dropped".to_string())
                    })?;
                }
            }
            self.steps
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(BridgeError::OperationFailed("script exhausted".to_string())))
        }
    }

    fn ok_response(body: &str) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }

    fn status_response(status: u16) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        })
    }

    fn network_error() -> BridgeResult<HttpResponse> {
        Err(BridgeError::OperationFailed("connection reset".to_string()))
    }

    async fn seeded_store(refresh_token: Option<&str>) -> CredentialStore {
        let store = CredentialStore::new(Arc::new(MockSecureStore::default()));
        store
            .save(&Credential::new(
                "stale-access".to_string(),
                refresh_token.map(|t| t.to_string()),
            ))
            .await
            .unwrap();
        store
    }

    fn coordinator(http: Arc<ScriptedHttpClient>, store: CredentialStore) -> RenewalCoordinator {
        RenewalCoordinator::new(
            http,
            store,
            EventBus::default(),
            "https://api.example.com/users",
            "k",
            1,
        )
    }

    #[tokio::test]
    async fn successful_renewal_replaces_credential() {
        let http = Arc::new(ScriptedHttpClient::new(vec![ok_response(
            r#"{"token":"fresh-access","refresh_token":"fresh-refresh"}"#,
        )]));
        let store = seeded_store(Some("old-refresh")).await;
        let coordinator = coordinator(http.clone(), store.clone());

        assert_eq!(coordinator.renew().await, RenewalOutcome::Renewed);
        assert_eq!(http.call_count(), 1);

        let credential = store.load().await.unwrap().unwrap();
        assert_eq!(credential.access_token, "fresh-access");
        assert_eq!(credential.refresh_token.as_deref(), Some("fresh-refresh"));
    }

    #[tokio::test]
    async fn refresh_credential_kept_when_response_omits_rotation() {
        let http = Arc::new(ScriptedHttpClient::new(vec![ok_response(
            r#"{"token":"fresh-access"}"#,
        )]));
        let store = seeded_store(Some("old-refresh")).await;
        let coordinator = coordinator(http, store.clone());

        assert_eq!(coordinator.renew().await, RenewalOutcome::Renewed);

        let credential = store.load().await.unwrap().unwrap();
        assert_eq!(credential.refresh_token.as_deref(), Some("old-refresh"));
    }

    #[tokio::test]
    async fn missing_refresh_credential_is_terminal_without_network() {
        let http = Arc::new(ScriptedHttpClient::new(vec![]));
        let store = seeded_store(None).await;
        let coordinator = coordinator(http.clone(), store.clone());

        assert_eq!(coordinator.renew().await, RenewalOutcome::Failed);
        assert_eq!(http.call_count(), 0);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_refresh_credential_is_not_retried() {
        let http = Arc::new(ScriptedHttpClient::new(vec![status_response(401)]));
        let store = seeded_store(Some("bad-refresh")).await;
        let coordinator = coordinator(http.clone(), store.clone());

        assert_eq!(coordinator.renew().await, RenewalOutcome::Failed);
        assert_eq!(http.call_count(), 1);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transient_failure_retried_once_then_succeeds() {
        // Steps pop from the back: network error first, then success.
        let http = Arc::new(ScriptedHttpClient::new(vec![
            ok_response(r#"{"token":"fresh-access"}"#),
            network_error(),
        ]));
        let store = seeded_store(Some("old-refresh")).await;
        let coordinator = coordinator(http.clone(), store.clone());

        assert_eq!(coordinator.renew().await, RenewalOutcome::Renewed);
        assert_eq!(http.call_count(), 2);
    }

    #[tokio::test]
    async fn failures_past_the_retry_bound_are_fatal() {
        let http = Arc::new(ScriptedHttpClient::new(vec![
            status_response(503),
            status_response(503),
        ]));
        let store = seeded_store(Some("old-refresh")).await;
        let coordinator = coordinator(http.clone(), store.clone());

        assert_eq!(coordinator.renew().await, RenewalOutcome::Failed);
        assert_eq!(http.call_count(), 2);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_renewal() {
        let (http, release) = ScriptedHttpClient::gated(vec![ok_response(
            r#"{"token":"fresh-access","refresh_token":"fresh-refresh"}"#,
        )]);
        let http = Arc::new(http);
        let store = seeded_store(Some("old-refresh")).await;
        let coordinator = coordinator(http.clone(), store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.renew().await })
            })
            .collect();

        // Let every caller converge on the shared future, then release the
        // single in-flight network call.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        release.send(true).unwrap();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), RenewalOutcome::Renewed);
        }
        assert_eq!(http.call_count(), 1);
    }

    #[tokio::test]
    async fn renewal_completes_even_when_the_caller_is_cancelled() {
        let (http, release) = ScriptedHttpClient::gated(vec![ok_response(
            r#"{"token":"fresh-access"}"#,
        )]);
        let http = Arc::new(http);
        let store = seeded_store(Some("old-refresh")).await;
        let coordinator = coordinator(http, store.clone());

        let caller = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.renew().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        caller.abort();
        assert!(caller.await.is_err());

        release.send(true).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let credential = store.load().await.unwrap().unwrap();
        assert_eq!(credential.access_token, "fresh-access");
    }

    #[tokio::test]
    async fn a_second_storm_starts_a_fresh_renewal() {
        let http = Arc::new(ScriptedHttpClient::new(vec![
            ok_response(r#"{"token":"second"}"#),
            ok_response(r#"{"token":"first"}"#),
        ]));
        let store = seeded_store(Some("old-refresh")).await;
        let coordinator = coordinator(http.clone(), store.clone());

        assert_eq!(coordinator.renew().await, RenewalOutcome::Renewed);
        // Allow the driver task to return the coordinator to idle.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(coordinator.renew().await, RenewalOutcome::Renewed);

        assert_eq!(http.call_count(), 2);
        let credential = store.load().await.unwrap().unwrap();
        assert_eq!(credential.access_token, "second");
    }
}
