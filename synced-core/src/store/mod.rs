//! Storage Collaborators
//!
//! A synchronized value talks to two stores it does not own:
//!
//! - a [`RemoteStore`], the backend that persists the value and pushes
//!   changes made elsewhere through a change feed;
//! - a [`LocalCache`], a string key-value store used as a fallback copy.
//!
//! Both are traits so applications can plug in their own backend client
//! and storage. The crate ships in-memory versions of both
//! ([`MemoryRemote`], [`MemoryCache`]) and a file-backed cache
//! ([`FileCache`]).

use std::future::Future;

use crate::error::Result;

mod file;
mod memory;

pub use file::FileCache;
pub use memory::{MemoryCache, MemoryRemote, MemorySubscription};

/// Callback invoked with the payload of each change-feed event.
pub type ChangeHandler<T> = Box<dyn Fn(T) + Send + Sync>;

/// Handle to an open change feed.
pub trait Subscription: Send + Sync {
    /// Stop receiving events.
    ///
    /// Must be idempotent and must not panic, including when the feed has
    /// already been closed by the remote side.
    fn unsubscribe(&self);
}

/// Remote persistence and change notification for one tracked document.
pub trait RemoteStore<T>: Send + Sync + 'static {
    type Subscription: Subscription + 'static;

    /// Fetch the current value.
    ///
    /// `Ok(None)` means the remote has no data yet; `Err` means the call
    /// itself failed.
    fn load(&self) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Persist a value.
    ///
    /// Returns `Ok(false)` when the remote declined to persist it. `Err` is
    /// reserved for transport or other unexpected failures.
    fn save(&self, value: &T) -> impl Future<Output = Result<bool>> + Send;

    /// Open a change feed delivering every value written remotely.
    fn subscribe(&self, on_change: ChangeHandler<T>) -> Result<Self::Subscription>;
}

/// Local string key-value store, in the manner of browser local storage.
///
/// Either call may fail (quota exceeded, storage disabled); callers treat
/// failures as non-fatal.
pub trait LocalCache: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: String) -> Result<()>;
}
