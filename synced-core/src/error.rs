//! Error types shared by the synchronization layer and its collaborators.
//!
//! Every variant except [`SyncError::InvalidKey`] is absorbed by
//! [`SyncedValue`](crate::SyncedValue): it is logged at the point where it
//! happens and never reaches the caller of a read or a write.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by remote stores, local caches and codecs.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote load, save or subscribe call failed.
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// The local key-value store refused a read or a write.
    #[error("local storage unavailable: {0}")]
    LocalStorageUnavailable(String),

    /// Stored text is not a valid encoding of the expected type.
    #[error("failed to decode stored value: {0}")]
    Decode(String),

    /// The value could not be turned into text.
    #[error("failed to encode value: {0}")]
    Encode(String),

    /// A remote call did not finish within the configured limit.
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// A cache key was built from an empty namespace or id.
    #[error("invalid cache key: {0}")]
    InvalidKey(String),
}

impl SyncError {
    /// Whether this error came from the remote side (including timeouts).
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_) | Self::Timeout(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_classification() {
        assert!(SyncError::RemoteUnavailable("offline".into()).is_remote());
        assert!(SyncError::Timeout(Duration::from_millis(5)).is_remote());
        assert!(!SyncError::LocalStorageUnavailable("quota".into()).is_remote());
        assert!(!SyncError::Decode("eof".into()).is_remote());
    }

    #[test]
    fn messages_carry_context() {
        let err = SyncError::LocalStorageUnavailable("quota exceeded".into());
        assert_eq!(err.to_string(), "local storage unavailable: quota exceeded");
    }
}
