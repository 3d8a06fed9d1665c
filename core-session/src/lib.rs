//! # Session Core
//!
//! Authentication-session engine for NVC client applications.
//!
//! ## Overview
//!
//! This crate owns the full credential lifecycle against the NVC identity
//! API: login with lockout shaping, signup, logout, durable credential
//! storage, and transparent renewal-and-replay for authorized calls. Hosts
//! inject their platform transport, secure storage, and clock through the
//! `bridge-traits` crate; the core contains no platform code.
//!
//! ## Features
//!
//! - Single façade ([`SessionController`]) over the whole session lifecycle
//! - Exactly-once renewal-and-replay on expired credentials, single-flight
//!   under concurrency
//! - Local login lockout with timed cooldown
//! - Atomic credential persistence through the host secure store
//! - Session events over a broadcast channel

pub mod config;
pub mod controller;
pub mod credential_store;
pub mod error;
pub mod events;
pub mod gateway;
pub mod lockout;
pub mod logging;
pub mod renewal;
pub mod types;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use controller::SessionController;
pub use error::{Result, SessionError};
pub use events::{EventBus, SessionEvent};
pub use types::{AuthResponse, Credential, LoginRequest, SignupRequest, UserProfile};
