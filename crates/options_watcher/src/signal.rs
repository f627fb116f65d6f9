//! Signal - multi-subscriber callback registry with cancellable handles.
//!
//! Delivery holds a dedicated raise lock, so once `Subscription::cancel`
//! returns the subscriber is guaranteed to receive nothing further.
//! Consequence: a callback must not cancel its own subscription from
//! inside the delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
    subscribers: Mutex<HashMap<u64, Slot<T>>>,
    raising: Mutex<()>,
    next_id: AtomicU64,
}

/// Multi-subscriber notification source.
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                subscribers: Mutex::new(HashMap::new()),
                raising: Mutex::new(()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a callback; the returned handle cancels on demand or on drop.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().insert(id, Arc::new(callback));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Deliver `payload` to every current subscriber.
    pub fn raise(&self, payload: &T) {
        let _delivering = self.inner.raising.lock();
        let slots: Vec<Slot<T>> = self.inner.subscribers.lock().values().cloned().collect();
        for slot in slots {
            slot(payload);
        }
    }
}

/// Cancellable subscription handle.
///
/// Holds only a weak reference: dropping the signal first is fine.
pub struct Subscription<T> {
    id: u64,
    inner: Weak<SignalInner<T>>,
}

impl<T> Subscription<T> {
    /// Remove the callback. Blocks until any in-flight delivery completes,
    /// so no call arrives after this returns.
    pub fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.lock().remove(&self.id);
            // Wait out a delivery that may have snapshotted this slot.
            drop(inner.raising.lock());
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_subscribe_and_raise() {
        let signal: Signal<u32> = Signal::new();
        let hits = Arc::new(AtomicU64::new(0));

        let hits_clone = hits.clone();
        let _subscription = signal.subscribe(move |value| {
            assert_eq!(*value, 7);
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.raise(&7);
        signal.raise(&7);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_stops_delivery() {
        let signal: Signal<u32> = Signal::new();
        let hits = Arc::new(AtomicU64::new(0));

        let hits_clone = hits.clone();
        let subscription = signal.subscribe(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        signal.raise(&1);
        subscription.cancel();
        signal.raise(&2);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let signal: Signal<u32> = Signal::new();
        {
            let _subscription = signal.subscribe(|_| {});
            assert_eq!(signal.subscriber_count(), 1);
        }
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_cancel_after_signal_dropped() {
        let subscription = {
            let signal: Signal<u32> = Signal::new();
            signal.subscribe(|_| {})
        };
        // Signal is gone; cancel must be a no-op, not a panic.
        subscription.cancel();
    }

    #[test]
    fn test_multiple_subscribers_all_delivered() {
        let signal: Signal<u32> = Signal::new();
        let hits = Arc::new(AtomicU64::new(0));

        let subscriptions: Vec<_> = (0..3)
            .map(|_| {
                let hits = hits.clone();
                signal.subscribe(move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        signal.raise(&0);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        drop(subscriptions);
    }
}
