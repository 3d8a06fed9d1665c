use thiserror::Error;

/// Failure surface shared by every host bridge.
///
/// Implementations flatten platform-specific errors into these variants;
/// the session core treats them all as opaque transport/storage failures
/// and only surfaces the message.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The capability is not implemented or not usable on this host.
    #[error("bridge capability not available: {0}")]
    NotAvailable(String),

    /// The operation was attempted and failed (connection reset, DNS,
    /// storage write rejection, ...).
    #[error("bridge operation failed: {0}")]
    OperationFailed(String),

    /// The host denied access to the backing facility, e.g. a locked
    /// keychain or a revoked storage entitlement.
    #[error("bridge access denied: {0}")]
    AccessDenied(String),

    /// The operation exceeded the deadline the caller requested.
    #[error("bridge operation timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
