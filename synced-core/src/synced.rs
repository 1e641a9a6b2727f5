//! Synchronized Values
//!
//! A [`SyncedValue`] keeps one piece of application state mirrored across
//! three places: an in-memory [`Signal`] the UI reads, a [`RemoteStore`]
//! that persists it and pushes remote changes, and a [`LocalCache`] that
//! holds a text copy for when the remote cannot be reached.
//!
//! # Lifecycle
//!
//! 1. Construction stores the initial value, marks the value as loading,
//!    opens the remote change feed and spawns the initial load.
//! 2. The initial load adopts the remote value if there is one. If the
//!    remote call fails, the cached copy is decoded and adopted instead.
//!    Either way loading ends exactly once.
//! 3. Every change-feed event overwrites the in-memory value and is
//!    mirrored into the cache.
//! 4. [`SyncedValue::write`] applies the new value in memory and mirrors it
//!    into the cache before returning, then saves it remotely in the
//!    background.
//! 5. Dropping the value releases the change feed.
//!
//! # Failure Handling
//!
//! Remote, cache and codec failures are logged where they happen and never
//! reach the caller. The in-memory value is never rolled back. Callers that
//! care whether a write reached the remote can await its [`WriteReceipt`].
//!
//! # Ordering
//!
//! There is no versioning. Whatever is applied last wins, whether it is a
//! local write, a change-feed event or the initial load.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SyncOptions;
use crate::error::{Result, SyncError};
use crate::key::CacheKey;
use crate::reactive::Signal;
use crate::store::{ChangeHandler, LocalCache, RemoteStore, Subscription};

/// A new value for [`SyncedValue::write`].
pub enum Write<T> {
    /// Replace the current value.
    Value(T),

    /// Compute the new value from the value current at call time.
    ///
    /// See [`Write::update`] for the locking rules the closure must follow.
    Update(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> Write<T> {
    /// Wrap an updater closure.
    ///
    /// # Deadlocks
    ///
    /// The closure runs while the value is locked. It must not read or
    /// write the same [`SyncedValue`] or its signal.
    pub fn update<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        Self::Update(Box::new(f))
    }
}

impl<T: fmt::Debug> fmt::Debug for Write<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Update(_) => f.write_str("Update(..)"),
        }
    }
}

/// What happened to a write on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The remote confirmed it persisted the value.
    Saved,
    /// The remote answered but did not persist the value.
    Rejected,
    /// The save call errored or timed out.
    Failed,
}

/// Result of a write, reported through a [`WriteReceipt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub remote: RemoteOutcome,
    /// Whether the local cache accepted the value.
    pub cached: bool,
}

/// Optional side channel for the background part of a write.
///
/// Dropping the receipt does not cancel anything.
#[derive(Debug)]
pub struct WriteReceipt {
    rx: oneshot::Receiver<WriteOutcome>,
}

impl WriteReceipt {
    /// Wait for the remote save to finish.
    ///
    /// Returns `None` if the save task went away without reporting, which
    /// only happens when the runtime is shutting down.
    pub async fn outcome(self) -> Option<WriteOutcome> {
        self.rx.await.ok()
    }
}

struct Shared<T, R, C>
where
    T: Clone + Send + Sync + 'static,
{
    key: CacheKey,
    storage_key: String,
    state: Signal<T>,
    remote: Arc<R>,
    cache: Arc<C>,
    options: SyncOptions,
    /// Held across a cell update and its cache mirror, so memory and cache
    /// always agree on which applied value came last.
    apply_lock: Mutex<()>,
}

impl<T, R, C> Shared<T, R, C>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    R: RemoteStore<T>,
    C: LocalCache,
{
    fn open_feed(self: &Arc<Self>) -> Option<R::Subscription> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handler: ChangeHandler<T> = Box::new(move |value: T| {
            if let Some(shared) = weak.upgrade() {
                shared.apply_remote_change(value);
            }
        });

        match self.remote.subscribe(handler) {
            Ok(subscription) => {
                debug!(key = %self.key, "change feed opened");
                Some(subscription)
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "could not open change feed");
                None
            }
        }
    }

    fn apply_remote_change(&self, value: T) {
        let _apply = self.apply_lock.lock();
        self.state.set(value.clone());
        self.mirror(&value);
        debug!(key = %self.key, "applied change feed event");
    }

    async fn initial_load(self: Arc<Self>, loading: watch::Sender<bool>) {
        match self.load_remote().await {
            Ok(Some(value)) => {
                self.state.set(value);
                debug!(key = %self.key, "adopted remote value");
            }
            Ok(None) => {
                debug!(key = %self.key, "remote has no value yet, keeping initial value");
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "remote load failed, trying local cache");
                self.restore_from_cache();
            }
        }

        loading.send_replace(false);
    }

    async fn load_remote(&self) -> Result<Option<T>> {
        match self.options.load_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.remote.load())
                .await
                .map_err(|_| SyncError::Timeout(limit))?,
            None => self.remote.load().await,
        }
    }

    fn restore_from_cache(&self) {
        let text = match self.cache.get(&self.storage_key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(key = %self.key, "no cached copy, keeping initial value");
                return;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "could not read local cache");
                return;
            }
        };

        match self.options.codec.decode::<T>(&text) {
            Ok(value) => {
                self.state.set(value);
                info!(key = %self.key, "restored value from local cache");
            }
            Err(e) => warn!(key = %self.key, error = %e, "discarding unreadable cached copy"),
        }
    }

    /// Encode and store `value` in the local cache. Returns whether it stuck.
    fn mirror(&self, value: &T) -> bool {
        let stored = self
            .options
            .codec
            .encode(value)
            .and_then(|text| self.cache.set(&self.storage_key, text));

        match stored {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %self.key, error = %e, "could not mirror value into local cache");
                false
            }
        }
    }

    async fn save_remote(&self, value: &T) -> RemoteOutcome {
        let saved = match self.options.save_timeout() {
            Some(limit) => tokio::time::timeout(limit, self.remote.save(value))
                .await
                .unwrap_or(Err(SyncError::Timeout(limit))),
            None => self.remote.save(value).await,
        };

        match saved {
            Ok(true) => {
                info!(key = %self.key, "value saved to remote");
                RemoteOutcome::Saved
            }
            Ok(false) => {
                warn!(key = %self.key, "remote did not persist value, local copy kept");
                RemoteOutcome::Rejected
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "remote save failed, local copy kept");
                RemoteOutcome::Failed
            }
        }
    }
}

/// A value mirrored between memory, a remote store and a local cache.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use synced_core::{CacheKey, MemoryCache, MemoryRemote, SyncedValue, Write};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let remote = Arc::new(MemoryRemote::with_value(String::from("hello")));
/// let cache = Arc::new(MemoryCache::new());
/// let key = CacheKey::new("notes", "doc").unwrap();
///
/// let doc = SyncedValue::new(key, String::new(), remote, cache);
/// doc.loaded().await;
/// assert_eq!(doc.value(), "hello");
///
/// doc.write(Write::update(|text: &String| format!("{text} world")));
/// assert_eq!(doc.value(), "hello world");
/// # }
/// ```
pub struct SyncedValue<T, R, C>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    R: RemoteStore<T>,
    C: LocalCache,
{
    shared: Arc<Shared<T, R, C>>,
    loading: watch::Receiver<bool>,
    load_task: JoinHandle<()>,
    subscription: Option<R::Subscription>,
}

impl<T, R, C> SyncedValue<T, R, C>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    R: RemoteStore<T>,
    C: LocalCache,
{
    /// Create a synchronized value with default options.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(key: CacheKey, initial: T, remote: Arc<R>, cache: Arc<C>) -> Self {
        Self::with_options(key, initial, remote, cache, SyncOptions::default())
    }

    /// Create a synchronized value.
    ///
    /// Opens the change feed before returning and spawns the initial load
    /// on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn with_options(
        key: CacheKey,
        initial: T,
        remote: Arc<R>,
        cache: Arc<C>,
        options: SyncOptions,
    ) -> Self {
        let shared = Arc::new(Shared {
            storage_key: key.storage_key(),
            key,
            state: Signal::new(initial),
            remote,
            cache,
            options,
            apply_lock: Mutex::new(()),
        });

        let (loading_tx, loading) = watch::channel(true);
        let subscription = shared.open_feed();
        let load_task = tokio::spawn(Arc::clone(&shared).initial_load(loading_tx));

        Self {
            shared,
            loading,
            load_task,
            subscription,
        }
    }

    /// The current in-memory value.
    pub fn value(&self) -> T {
        self.shared.state.get()
    }

    /// Whether the initial load is still running.
    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Wait until the initial load has finished.
    pub async fn loaded(&self) {
        let mut loading = self.loading.clone();
        // An error means the load task was aborted; nothing left to wait for.
        let _ = loading.wait_for(|loading| !*loading).await;
    }

    /// The signal backing this value, for views that re-render on change.
    pub fn signal(&self) -> Signal<T> {
        self.shared.state.clone()
    }

    /// The key this value is cached under.
    pub fn key(&self) -> &CacheKey {
        &self.shared.key
    }

    /// Apply a new value.
    ///
    /// The in-memory value and the local cache are updated before this
    /// returns. The remote save runs in the background; its result is only
    /// visible in the logs and through the returned receipt.
    ///
    /// # Deadlocks
    ///
    /// Must not be called from an updater closure or from a signal
    /// subscriber notified by this same value.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn write(&self, write: Write<T>) -> WriteReceipt {
        let (value, cached) = {
            let _apply = self.shared.apply_lock.lock();
            let value = match write {
                Write::Value(value) => self.shared.state.update(move |_| value),
                Write::Update(f) => self.shared.state.update(f),
            };
            let cached = self.shared.mirror(&value);
            (value, cached)
        };

        let (tx, rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let remote = shared.save_remote(&value).await;
            // The caller may have dropped the receipt.
            let _ = tx.send(WriteOutcome { remote, cached });
        });

        WriteReceipt { rx }
    }
}

impl<T, R, C> Drop for SyncedValue<T, R, C>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    R: RemoteStore<T>,
    C: LocalCache,
{
    fn drop(&mut self) {
        self.load_task.abort();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            debug!(key = %self.shared.key, "change feed released");
        }
    }
}

impl<T, R, C> fmt::Debug for SyncedValue<T, R, C>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + fmt::Debug + 'static,
    R: RemoteStore<T>,
    C: LocalCache,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedValue")
            .field("key", &self.shared.key)
            .field("value", &self.value())
            .field("loading", &self.is_loading())
            .field("subscribed", &self.subscription.is_some())
            .finish()
    }
}
