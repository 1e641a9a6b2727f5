//! Scoped cache keys.
//!
//! Instances sharing a storage key race each other with last-write-wins
//! semantics, so every key carries an explicit namespace.

use std::fmt;

use crate::error::{Result, SyncError};

/// Identifier under which a value's encoded form is stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    id: String,
}

impl CacheKey {
    /// Build a key from a namespace and an id. Neither may be empty.
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let id = id.into();

        if namespace.trim().is_empty() {
            return Err(SyncError::InvalidKey("namespace is empty".into()));
        }
        if id.trim().is_empty() {
            return Err(SyncError::InvalidKey(format!(
                "id is empty in namespace {namespace:?}"
            )));
        }

        Ok(Self { namespace, id })
    }

    /// Get the namespace part of the key.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get the id part of the key.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The string actually handed to the local cache.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.namespace, self.id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.id)
    }
}
