//! Reversible text encoding of cached values.
//!
//! The local cache only stores strings, so every codec produces text.
//! `Compact` packs the value as MessagePack and wraps the bytes in base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Text encoding used for local cache entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCodec {
    /// Plain JSON. Readable in browser devtools or on disk.
    #[default]
    Json,

    /// Base64-wrapped MessagePack.
    Compact,
}

impl TextCodec {
    /// Encode a value as text.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            Self::Json => {
                serde_json::to_string(value).map_err(|e| SyncError::Encode(e.to_string()))
            }
            Self::Compact => {
                let bytes =
                    rmp_serde::to_vec_named(value).map_err(|e| SyncError::Encode(e.to_string()))?;
                Ok(STANDARD.encode(bytes))
            }
        }
    }

    /// Decode text produced by [`TextCodec::encode`].
    pub fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        match self {
            Self::Json => serde_json::from_str(text).map_err(|e| SyncError::Decode(e.to_string())),
            Self::Compact => {
                let bytes = STANDARD
                    .decode(text.trim())
                    .map_err(|e| SyncError::Decode(e.to_string()))?;
                rmp_serde::from_slice(&bytes).map_err(|e| SyncError::Decode(e.to_string()))
            }
        }
    }
}
