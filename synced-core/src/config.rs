//! Options controlling a [`SyncedValue`](crate::SyncedValue).
//!
//! Defaults leave remote calls without a time limit: a hung load keeps the
//! value in the loading state until the remote client gives up on its own.

use std::time::Duration;

use serde::Deserialize;

use crate::codec::TextCodec;
use crate::error::{Result, SyncError};

/// Per-value synchronization options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncOptions {
    /// Encoding used for local cache entries.
    pub codec: TextCodec,

    /// Give up on the initial remote load after this many milliseconds.
    pub load_timeout_ms: Option<u64>,

    /// Give up on a remote save after this many milliseconds.
    pub save_timeout_ms: Option<u64>,
}

impl SyncOptions {
    /// Parse options from a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SyncError::Decode(format!("sync options: {e}")))
    }

    /// Set the cache encoding.
    pub fn with_codec(mut self, codec: TextCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Bound the initial load. Durations past `u64::MAX` ms saturate.
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout_ms = Some(saturating_millis(timeout));
        self
    }

    /// Bound each remote save. Durations past `u64::MAX` ms saturate.
    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout_ms = Some(saturating_millis(timeout));
        self
    }

    /// The initial load limit, if any.
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    /// The remote save limit, if any.
    pub fn save_timeout(&self) -> Option<Duration> {
        self.save_timeout_ms.map(Duration::from_millis)
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
