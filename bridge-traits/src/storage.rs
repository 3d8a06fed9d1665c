//! Durable Client-Local Storage Abstraction
//!
//! The session core persists exactly one kind of state: the credential pair.
//! Hosts back [`SecureStore`] with whatever the platform offers:
//!
//! - macOS/iOS: Keychain
//! - Android: Keystore
//! - Windows: DPAPI
//! - Linux: Secret Service
//! - Web: encrypted localStorage / IndexedDB
//!
//! Implementations must encrypt at rest where the platform allows it and
//! must never log stored values.

use async_trait::async_trait;

use crate::error::Result;

/// Secure key/value storage for opaque secrets.
///
/// Writes must be atomic per key: a concurrent reader sees either the
/// previous value or the new one, never a partial write.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret, overwriting any previous value under `key`.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret. Returns `Ok(None)` when the key does not exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Idempotent: deleting a missing key succeeds.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check for a secret without retrieving it.
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct InMemoryStore {
        entries: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl SecureStore for InMemoryStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> Result<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn has_secret_default_uses_get() {
        let store = InMemoryStore {
            entries: Mutex::new(HashMap::new()),
        };

        assert!(!store.has_secret("missing").await.unwrap());
        store.set_secret("present", b"v").await.unwrap();
        assert!(store.has_secret("present").await.unwrap());
    }
}
