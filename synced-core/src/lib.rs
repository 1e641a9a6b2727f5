//! Synced Core
//!
//! State cells that stay mirrored between memory, a remote store and a
//! local cache.
//!
//! A [`SyncedValue`] hands the UI a value that is always readable. It
//! starts from an initial value, adopts whatever the remote store holds,
//! falls back to a cached copy when the remote cannot be reached, follows
//! the remote change feed, and applies local writes immediately while
//! persisting them in the background.
//!
//! # Architecture
//!
//! - `reactive`: the in-memory [`Signal`](reactive::Signal) views bind to
//! - `store`: the [`RemoteStore`] and [`LocalCache`] contracts, plus
//!   in-memory and file-backed implementations
//! - `codec`: reversible text encoding for cache entries
//! - `key`: namespaced cache keys
//! - `config`: per-value [`SyncOptions`]
//! - `synced`: [`SyncedValue`] itself
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use synced_core::{CacheKey, MemoryCache, MemoryRemote, SyncedValue, Write};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let remote = Arc::new(MemoryRemote::<u32>::new());
//! remote.set_fail_load(true);
//! let cache = Arc::new(MemoryCache::new());
//!
//! let count = SyncedValue::new(
//!     CacheKey::new("demo", "count").unwrap(),
//!     0u32,
//!     remote,
//!     cache,
//! );
//! count.loaded().await;
//!
//! count.write(Write::update(|n: &u32| n + 1));
//! assert_eq!(count.value(), 1);
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod reactive;
pub mod store;
pub mod synced;

pub use codec::TextCodec;
pub use config::SyncOptions;
pub use error::{Result, SyncError};
pub use key::CacheKey;
pub use store::{
    ChangeHandler, FileCache, LocalCache, MemoryCache, MemoryRemote, RemoteStore, Subscription,
};
pub use synced::{RemoteOutcome, SyncedValue, Write, WriteOutcome, WriteReceipt};
