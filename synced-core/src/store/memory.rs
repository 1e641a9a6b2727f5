//! In-memory store implementations.
//!
//! `MemoryRemote` behaves like a small document backend: it keeps one
//! value, fans every stored value out to change-feed subscribers, and can
//! be told to fail or stall so callers can rehearse degraded conditions.
//! `MemoryCache` stands in for browser local storage.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::{ChangeHandler, LocalCache, RemoteStore, Subscription};
use crate::error::{Result, SyncError};

type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Feed<T> {
    listeners: Vec<(u64, Listener<T>)>,
    next_id: u64,
    closed: bool,
}

struct RemoteInner<T> {
    value: Mutex<Option<T>>,
    feed: Mutex<Feed<T>>,
    fail_load: AtomicBool,
    fail_save: AtomicBool,
    reject_save: AtomicBool,
    fail_subscribe: AtomicBool,
    echo_saves: AtomicBool,
    latency_ms: AtomicU64,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl<T: Clone> RemoteInner<T> {
    fn broadcast(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .feed
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(value.clone());
        }
    }

    fn remove_listener(&self, id: u64) {
        self.feed.lock().listeners.retain(|(lid, _)| *lid != id);
    }

    async fn pause(&self) {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
    }
}

/// In-process remote store with a change feed and fault injection.
///
/// Clones share the same backend, so one clone can be handed to a
/// [`SyncedValue`](crate::SyncedValue) while another plays the part of a
/// second client publishing changes.
pub struct MemoryRemote<T> {
    inner: Arc<RemoteInner<T>>,
}

impl<T> Clone for MemoryRemote<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for MemoryRemote<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryRemote<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A remote with no data yet.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RemoteInner {
                value: Mutex::new(None),
                feed: Mutex::new(Feed {
                    listeners: Vec::new(),
                    next_id: 0,
                    closed: false,
                }),
                fail_load: AtomicBool::new(false),
                fail_save: AtomicBool::new(false),
                reject_save: AtomicBool::new(false),
                fail_subscribe: AtomicBool::new(false),
                echo_saves: AtomicBool::new(true),
                latency_ms: AtomicU64::new(0),
                loads: AtomicUsize::new(0),
                saves: AtomicUsize::new(0),
            }),
        }
    }

    /// A remote already holding `value`.
    pub fn with_value(value: T) -> Self {
        let remote = Self::new();
        *remote.inner.value.lock() = Some(value);
        remote
    }

    /// Make `load` fail with [`SyncError::RemoteUnavailable`].
    pub fn set_fail_load(&self, fail: bool) {
        self.inner.fail_load.store(fail, Ordering::SeqCst);
    }

    /// Make `save` fail with [`SyncError::RemoteUnavailable`].
    pub fn set_fail_save(&self, fail: bool) {
        self.inner.fail_save.store(fail, Ordering::SeqCst);
    }

    /// Make `save` return `Ok(false)` without storing anything.
    pub fn set_reject_save(&self, reject: bool) {
        self.inner.reject_save.store(reject, Ordering::SeqCst);
    }

    /// Make `subscribe` fail with [`SyncError::RemoteUnavailable`].
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.inner.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Whether a successful save is pushed back through the change feed.
    /// On by default.
    pub fn set_echo_saves(&self, echo: bool) {
        self.inner.echo_saves.store(echo, Ordering::SeqCst);
    }

    /// Delay every load and save by `latency`. `None` removes the delay.
    pub fn set_latency(&self, latency: Option<Duration>) {
        let millis = latency
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        self.inner.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// The value currently persisted.
    pub fn stored(&self) -> Option<T> {
        self.inner.value.lock().clone()
    }

    /// Store a value written by some other client and push it to every
    /// subscriber.
    pub fn publish(&self, value: T) {
        *self.inner.value.lock() = Some(value.clone());
        self.inner.broadcast(&value);
    }

    /// End the change feed. Existing subscriptions stop receiving events
    /// and new subscriptions fail.
    pub fn close(&self) {
        let mut feed = self.inner.feed.lock();
        feed.closed = true;
        feed.listeners.clear();
    }

    /// Get the number of open change-feed subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.feed.lock().listeners.len()
    }

    /// Get the number of `load` calls that reached the store.
    pub fn load_count(&self) -> usize {
        self.inner.loads.load(Ordering::SeqCst)
    }

    /// Get the number of `save` calls that reached the store.
    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }
}

impl<T> RemoteStore<T> for MemoryRemote<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Subscription = MemorySubscription<T>;

    async fn load(&self) -> Result<Option<T>> {
        self.inner.pause().await;
        self.inner.loads.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_load.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable("load refused".into()));
        }
        let value = self.inner.value.lock().clone();
        Ok(value)
    }

    async fn save(&self, value: &T) -> Result<bool> {
        self.inner.pause().await;
        self.inner.saves.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_save.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable("save refused".into()));
        }
        if self.inner.reject_save.load(Ordering::SeqCst) {
            return Ok(false);
        }

        *self.inner.value.lock() = Some(value.clone());
        if self.inner.echo_saves.load(Ordering::SeqCst) {
            self.inner.broadcast(value);
        }
        Ok(true)
    }

    fn subscribe(&self, on_change: ChangeHandler<T>) -> Result<Self::Subscription> {
        if self.inner.fail_subscribe.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteUnavailable("subscribe refused".into()));
        }

        let mut feed = self.inner.feed.lock();
        if feed.closed {
            return Err(SyncError::RemoteUnavailable("change feed closed".into()));
        }

        let id = feed.next_id;
        feed.next_id += 1;
        feed.listeners.push((id, Arc::from(on_change)));
        debug!(listener = id, "change feed listener added");

        Ok(MemorySubscription {
            remote: Arc::downgrade(&self.inner),
            id,
            active: AtomicBool::new(true),
        })
    }
}

/// Subscription handle returned by [`MemoryRemote`].
pub struct MemorySubscription<T> {
    remote: Weak<RemoteInner<T>>,
    id: u64,
    active: AtomicBool,
}

impl<T> MemorySubscription<T> {
    /// Whether this subscription still receives events.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl<T> Subscription for MemorySubscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(remote) = self.remote.upgrade() {
            remote.remove_listener(self.id);
        }
    }
}

/// Concurrent in-memory string store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
    disabled: AtomicBool,
}

impl MemoryCache {
    /// Create an empty, enabled cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail, as browsers do when storage is turned off.
    pub fn disable(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }

    /// Undo [`MemoryCache::disable`].
    pub fn enable(&self) {
        self.disabled.store(false, Ordering::SeqCst);
    }

    /// Get the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(SyncError::LocalStorageUnavailable("storage disabled".into()));
        }
        Ok(())
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.check()?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
