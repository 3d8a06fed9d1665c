//! # Host Bridge Traits
//!
//! Platform abstraction traits the session core consumes but never
//! implements for production. Each trait is a capability the host must
//! provide: HTTP transport, durable secret storage, and a time source.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - the HTTP transport the core issues
//!   requests through; retry/TLS/pooling are the host's concern
//! - [`SecureStore`](storage::SecureStore) - durable client-local storage
//!   backing the credential store (Keychain/Keystore/DPAPI/...)
//! - [`Clock`](time::Clock) - time source, injectable for deterministic
//!   lockout and expiry tests ([`SystemClock`](time::SystemClock) in
//!   production)
//!
//! ## Error Handling
//!
//! Implementations convert platform-specific failures into
//! [`BridgeError`](error::BridgeError) with actionable messages. The core
//! maps those into its own taxonomy; it never inspects platform error
//! details.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; trait objects are shared across async
//! tasks behind `Arc`.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::SecureStore;
pub use time::{Clock, SystemClock};
