#![forbid(unsafe_code)]

//! Named-property change notification.
//!
//! Endpoints announce mutations through [`NotifyPropertyChanged`]: callers
//! subscribe a handler to one property name and receive a [`PropertyChanged`]
//! after the backing value has changed.
//!
//! [`PropertyChangedEvents`] is a thread-safe hub that endpoint types embed and
//! delegate to. [`EndpointMonitor`] is the per-object exclusive section the
//! engine holds while it reads, converts, and writes.
//!
//! # Invariants
//!
//! 1. Handlers for one property run in registration order.
//! 2. Handlers run outside the hub's lock: a handler may mutate other observed
//!    objects, or subscribe/unsubscribe, without deadlocking.
//! 3. A handler removed by `unsubscribe` is not called by any later `notify`.
//!    A `notify` already in progress may still reach it once.
//! 4. [`PropertyChangedEvents::assign`] notifies only when the value changed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

/// Event payload delivered to change handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyChanged<'a> {
    /// Name of the property whose value changed.
    pub property: &'a str,
}

/// A change handler. Shared so the hub can snapshot its list cheaply.
pub type ChangeHandler = Arc<dyn Fn(&PropertyChanged<'_>) + Send + Sync>;

/// Token identifying one subscription on one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// An object that raises named-property mutation events.
pub trait NotifyPropertyChanged: Send + Sync {
    /// Register `handler` for changes to `property`.
    fn subscribe(&self, property: &str, handler: ChangeHandler) -> SubscriptionId;

    /// Remove a handler. Returns `false` if it was not registered.
    fn unsubscribe(&self, property: &str, id: SubscriptionId) -> bool;
}

/// Thread-safe subscriber table keyed by property name.
pub struct PropertyChangedEvents {
    handlers: Mutex<AHashMap<String, Vec<(SubscriptionId, ChangeHandler)>>>,
    next_id: AtomicU64,
}

impl Default for PropertyChangedEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyChangedEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChangedEvents")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl PropertyChangedEvents {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(AHashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a handler for `property`.
    pub fn subscribe(&self, property: &str, handler: ChangeHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .entry(property.to_owned())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a handler previously returned by [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, property: &str, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let Some(list) = handlers.get_mut(property) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(property);
        }
        removed
    }

    /// Call every handler subscribed to `property`.
    pub fn notify(&self, property: &str) {
        let snapshot: Vec<ChangeHandler> = match self.handlers.lock().get(property) {
            Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return,
        };
        let event = PropertyChanged { property };
        for handler in snapshot {
            handler(&event);
        }
    }

    /// Store `value` into `slot` and notify `property` if it differs from the
    /// previous value. The slot lock is released before handlers run.
    ///
    /// Returns whether a change was recorded.
    pub fn assign<V: PartialEq>(&self, property: &str, slot: &Mutex<V>, value: V) -> bool {
        {
            let mut current = slot.lock();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.notify(property);
        true
    }

    /// Number of handlers registered for `property`.
    #[must_use]
    pub fn subscribers_of(&self, property: &str) -> usize {
        self.handlers.lock().get(property).map_or(0, Vec::len)
    }

    /// Total number of handlers across all properties.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().values().map(Vec::len).sum()
    }
}

impl NotifyPropertyChanged for PropertyChangedEvents {
    fn subscribe(&self, property: &str, handler: ChangeHandler) -> SubscriptionId {
        PropertyChangedEvents::subscribe(self, property, handler)
    }

    fn unsubscribe(&self, property: &str, id: SubscriptionId) -> bool {
        PropertyChangedEvents::unsubscribe(self, property, id)
    }
}

/// Per-object exclusive section used while a binding reads, converts, and
/// writes.
///
/// Reentrant: the owning thread may enter again, which happens when a write
/// cascades through another binding that shares this object, or when both
/// endpoints of a binding are the same object.
#[derive(Default)]
pub struct EndpointMonitor {
    lock: ReentrantMutex<()>,
}

/// Held while inside an [`EndpointMonitor`].
pub type MonitorGuard<'a> = ReentrantMutexGuard<'a, ()>;

impl EndpointMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lock: ReentrantMutex::new(()),
        }
    }

    /// Block until this thread owns the monitor.
    pub fn enter(&self) -> MonitorGuard<'_> {
        self.lock.lock()
    }

    /// Enter without blocking, if the monitor is free or already ours.
    pub fn try_enter(&self) -> Option<MonitorGuard<'_>> {
        self.lock.try_lock()
    }

    /// Whether some thread currently owns the monitor.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.lock.is_locked()
    }
}

impl fmt::Debug for EndpointMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointMonitor")
            .field("held", &self.is_held())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, ChangeHandler) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (
            count,
            Arc::new(move |_: &PropertyChanged<'_>| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn notify_reaches_only_matching_property() {
        let events = PropertyChangedEvents::new();
        let (count, handler) = counter();
        events.subscribe("value", handler);

        events.notify("other");
        assert_eq!(count.load(Ordering::SeqCst), 0);

        events.notify("value");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let events = PropertyChangedEvents::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let o = Arc::clone(&order);
            events.subscribe("p", Arc::new(move |_: &PropertyChanged<'_>| o.lock().push(i)));
        }
        events.notify("p");
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let events = PropertyChangedEvents::new();
        let (count, handler) = counter();
        let id = events.subscribe("value", handler);

        assert!(events.unsubscribe("value", id));
        assert!(!events.unsubscribe("value", id), "second removal reports absence");
        events.notify("value");
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(events.subscriber_count(), 0);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let events = Arc::new(PropertyChangedEvents::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let (count, _) = counter();

        let ev = Arc::clone(&events);
        let s = Arc::clone(&slot);
        let c = Arc::clone(&count);
        let id = events.subscribe(
            "p",
            Arc::new(move |e: &PropertyChanged<'_>| {
                c.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *s.lock() {
                    ev.unsubscribe(e.property, id);
                }
            }),
        );
        *slot.lock() = Some(id);

        events.notify("p");
        events.notify("p");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn assign_notifies_only_on_change() {
        let events = PropertyChangedEvents::new();
        let (count, handler) = counter();
        events.subscribe("n", handler);
        let slot = Mutex::new(3);

        assert!(!events.assign("n", &slot, 3));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(events.assign("n", &slot, 4));
        assert_eq!(*slot.lock(), 4);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn monitor_is_reentrant() {
        let monitor = EndpointMonitor::new();
        let outer = monitor.enter();
        let inner = monitor.try_enter();
        assert!(inner.is_some());
        drop(inner);
        drop(outer);
        assert!(!monitor.is_held());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Subscribe(u8),
            Unsubscribe(usize),
            Notify(u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..3).prop_map(Op::Subscribe),
                any::<usize>().prop_map(Op::Unsubscribe),
                (0u8..3).prop_map(Op::Notify),
            ]
        }

        proptest! {
            #[test]
            fn hub_matches_a_simple_model(ops in prop::collection::vec(op(), 0..64)) {
                let events = PropertyChangedEvents::new();
                let hits = Arc::new(AtomicUsize::new(0));
                let mut live: Vec<(String, SubscriptionId)> = Vec::new();
                let mut expected_hits = 0usize;

                for op in ops {
                    match op {
                        Op::Subscribe(p) => {
                            let name = format!("p{p}");
                            let h = Arc::clone(&hits);
                            let id = events.subscribe(
                                &name,
                                Arc::new(move |_: &PropertyChanged<'_>| {
                                    h.fetch_add(1, Ordering::SeqCst);
                                }),
                            );
                            live.push((name, id));
                        }
                        Op::Unsubscribe(i) if !live.is_empty() => {
                            let (name, id) = live.remove(i % live.len());
                            prop_assert!(events.unsubscribe(&name, id));
                        }
                        Op::Unsubscribe(_) => {}
                        Op::Notify(p) => {
                            let name = format!("p{p}");
                            expected_hits += live.iter().filter(|(n, _)| *n == name).count();
                            events.notify(&name);
                        }
                    }
                    prop_assert_eq!(events.subscriber_count(), live.len());
                }
                prop_assert_eq!(hits.load(Ordering::SeqCst), expected_hits);
            }
        }
    }

    #[test]
    fn monitor_excludes_other_threads() {
        let monitor = Arc::new(EndpointMonitor::new());
        let _guard = monitor.enter();
        let m = Arc::clone(&monitor);
        let other = std::thread::spawn(move || m.try_enter().is_some())
            .join()
            .unwrap();
        assert!(!other);
    }
}
