//! Signal Implementation
//!
//! A Signal holds the in-memory copy of a value and tells interested
//! subscribers whenever it changes. It is the state binding a UI reads
//! from; [`SyncedValue`](crate::SyncedValue) writes into it.
//!
//! # Thread Safety
//!
//! The value sits behind a `parking_lot::RwLock`. Notification callbacks
//! are cloned out of the registry and invoked after every lock has been
//! released, so a callback may freely read the signal again.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::SubscriberId;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type Notifier = Arc<dyn Fn() + Send + Sync>;

/// A reactive cell holding a value of type T.
///
/// Clones share the same value and subscriber list.
///
/// ```rust
/// use synced_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.update(|v| v + 1), 6);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    id: u64,
    value: Arc<RwLock<T>>,
    notifiers: Arc<RwLock<Vec<(SubscriberId, Notifier)>>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Arc::new(RwLock::new(value)),
            notifiers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
        self.notify_subscribers();
    }

    /// Compute a new value from the current one and store it.
    ///
    /// Read and write happen under a single lock, so two updates issued
    /// back to back compose in call order. Returns the stored value.
    ///
    /// # Deadlocks
    ///
    /// `f` runs while the write lock is held. Reading or writing this
    /// signal (or any clone of it) from inside `f` deadlocks.
    pub fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let mut guard = self.value.write();
            let next = f(&guard);
            *guard = next.clone();
            next
        };
        self.notify_subscribers();
        new_value
    }

    /// Register a callback invoked after every change.
    pub fn subscribe<F>(&self, subscriber_id: SubscriberId, notify: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifiers.write().push((subscriber_id, Arc::new(notify)));
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.notifiers.write().retain(|(id, _)| *id != subscriber_id);
    }

    /// Get the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.notifiers.read().len()
    }

    fn notify_subscribers(&self) {
        let notifiers: Vec<Notifier> = self
            .notifiers
            .read()
            .iter()
            .map(|(_, notify)| Arc::clone(notify))
            .collect();

        for notify in notifiers {
            notify();
        }
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            notifiers: Arc::clone(&self.notifiers),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &*self.value.read())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update_returns_new_value() {
        let signal = Signal::new(10);
        assert_eq!(signal.update(|v| v + 5), 15);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn back_to_back_updates_compose() {
        let signal = Signal::new(String::from("a"));
        signal.update(|v| format!("{v}b"));
        signal.update(|v| format!("{v}c"));
        assert_eq!(signal.get(), "abc");
    }

    #[test]
    fn signal_notifies_subscribers() {
        let signal = Signal::new(0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        signal.subscribe(SubscriberId::new(), move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set(1);
        signal.update(|v| v + 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn callback_can_read_signal() {
        let signal = Signal::new(0);
        let seen = Arc::new(AtomicI32::new(-1));

        let reader = signal.clone();
        let seen_clone = seen.clone();
        signal.subscribe(SubscriberId::new(), move || {
            seen_clone.store(reader.get(), Ordering::SeqCst);
        });

        signal.set(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn signal_unsubscribe() {
        let signal = Signal::new(0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let subscriber_id = SubscriberId::new();
        signal.subscribe(subscriber_id, move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.set(1);
        signal.unsubscribe(subscriber_id);
        signal.unsubscribe(subscriber_id);
        signal.set(2);

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);
        assert_ne!(s1.id(), s2.id());
    }
}
