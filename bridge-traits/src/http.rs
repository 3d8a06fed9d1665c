//! HTTP Transport Abstraction
//!
//! The core never speaks HTTP directly. Hosts inject an [`HttpClient`]
//! implementation (reqwest on desktop, URLSession on iOS, fetch on web) and
//! the core builds requests against this neutral surface. Retry, TLS, and
//! connection pooling are transport concerns and live behind this trait;
//! credential renewal and replay are session concerns and live in the core.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// HTTP method subset used by the session core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Outbound HTTP request.
///
/// Built by the core with headers already attached (API key, bearer
/// credential). Implementations must send it as-is and must not inject
/// authorization of their own.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a bearer credential as the `Authorization` header.
    pub fn bearer(self, token: impl AsRef<str>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.as_ref()))
    }

    /// Serialize `body` as JSON and set the content type.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)
            .map_err(|e| BridgeError::OperationFailed(format!("JSON encoding failed: {e}")))?;
        self.body = Some(Bytes::from(encoded));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Inbound HTTP response.
///
/// A response is returned for every completed exchange, including 4xx/5xx;
/// `Err` from [`HttpClient::execute`] means the exchange itself failed
/// (DNS, connect, timeout), never a server-side status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::OperationFailed(format!("JSON decoding failed: {e}")))
    }

    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("invalid UTF-8 body: {e}")))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The status the session core treats as "credential rejected".
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Async HTTP client provided by the host platform.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute a single HTTP exchange.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was obtained: connection
    /// failure, TLS failure, or timeout.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_auth_headers() {
        let request = HttpRequest::new(HttpMethod::Post, "https://api.example.com/login")
            .header("x-api-key", "k123")
            .bearer("tok");

        assert_eq!(request.method.as_str(), "POST");
        assert_eq!(request.headers.get("x-api-key"), Some(&"k123".to_string()));
        assert_eq!(
            request.headers.get("Authorization"),
            Some(&"Bearer tok".to_string())
        );
    }

    #[test]
    fn json_body_sets_content_type() {
        #[derive(serde::Serialize)]
        struct Payload {
            email: String,
        }

        let request = HttpRequest::new(HttpMethod::Post, "https://api.example.com/login")
            .json(&Payload {
                email: "a@b.c".into(),
            })
            .unwrap();

        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert!(request.body.is_some());
    }

    #[test]
    fn response_status_classification() {
        let ok = HttpResponse {
            status: 204,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(ok.is_success());
        assert!(!ok.is_unauthorized());

        let unauthorized = HttpResponse {
            status: 401,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(unauthorized.is_client_error());

        let outage = HttpResponse {
            status: 503,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(outage.is_server_error());
    }
}
