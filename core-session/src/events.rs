//! Session event bus.
//!
//! Publishes authentication state changes over a `tokio::sync::broadcast`
//! channel so UI layers can react (redraw, redirect, show a countdown)
//! without polling the session core. Emission is fire-and-forget: a bus with
//! no subscribers drops events silently.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default per-subscriber event buffer. Slow subscribers past this depth
/// receive `RecvError::Lagged` instead of blocking emitters.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Authentication state changes observable by hosts.
///
/// Events carry identifiers and durations only, never token material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A login or signup call stored a credential.
    SignedIn {
        /// Server-side user id, when the response included a profile.
        user_id: Option<String>,
    },
    /// Logout cleared the local credential.
    SignedOut,
    /// A credential renewal started.
    CredentialRenewing,
    /// Renewal succeeded; the stored credential was replaced.
    CredentialRenewed,
    /// Renewal failed; the stored credential was cleared.
    RenewalFailed { message: String },
    /// Repeated login failures triggered the cooldown.
    LockedOut { remaining_seconds: u64 },
}

impl SessionEvent {
    pub fn description(&self) -> &'static str {
        match self {
            SessionEvent::SignedIn { .. } => "user signed in",
            SessionEvent::SignedOut => "user signed out",
            SessionEvent::CredentialRenewing => "credential renewal started",
            SessionEvent::CredentialRenewed => "credential renewed",
            SessionEvent::RenewalFailed { .. } => "credential renewal failed",
            SessionEvent::LockedOut { .. } => "login locked out",
        }
    }
}

/// Broadcast channel for [`SessionEvent`]s.
///
/// Cheap to clone; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of subscribers reached, or an error when there are
    /// none. Emitters treat both as success.
    pub fn emit(&self, event: SessionEvent) -> Result<usize, SendError<SessionEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_events() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();

        bus.emit(SessionEvent::SignedIn {
            user_id: Some("u1".to_string()),
        })
        .unwrap();
        bus.emit(SessionEvent::SignedOut).unwrap();

        assert_eq!(
            receiver.recv().await.unwrap(),
            SessionEvent::SignedIn {
                user_id: Some("u1".to_string())
            }
        );
        assert_eq!(receiver.recv().await.unwrap(), SessionEvent::SignedOut);
    }

    #[test]
    fn emit_without_subscribers_is_an_error_not_a_panic() {
        let bus = EventBus::default();
        assert!(bus.emit(SessionEvent::SignedOut).is_err());
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = SessionEvent::LockedOut {
            remaining_seconds: 30,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"LockedOut\""));
        assert!(json.contains("30"));
    }
}
