#![forbid(unsafe_code)]

//! The standard endpoint fixture.
//!
//! Setters follow the usual notifying-property pattern: store, then notify
//! only if the value changed. If a change handler panics, the previous value
//! is restored before the panic continues, so a failed update leaves the
//! mutated object as it was.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use propbind_core::accessor::{AccessorTable, Bindable, Property, PropertyAccessors};
use propbind_core::notify::{
    ChangeHandler, EndpointMonitor, NotifyPropertyChanged, PropertyChangedEvents, SubscriptionId,
};

/// Panic message raised by the `fragile` setter for negative values.
pub const FRAGILE_PANIC: &str = "fragile property rejects negative values";

/// A change-notifying object with a handful of bindable properties.
#[derive(Default)]
pub struct BindingTestObject {
    number: Mutex<i32>,
    text: Mutex<Option<String>>,
    fragile: Mutex<i32>,
    changes: AtomicU64,
    events: PropertyChangedEvents,
    monitor: EndpointMonitor,
}

impl BindingTestObject {
    pub const NUMBER: Property<Self, i32> = Property::new("number");
    pub const TEXT: Property<Self, Option<String>> = Property::new("text");
    /// Read-only: how many property changes this object has recorded.
    pub const CHANGES: Property<Self, u64> = Property::new("changes");
    /// Setter panics on negative values.
    pub const FRAGILE: Property<Self, i32> = Property::new("fragile");
    /// Published nowhere; resolving it fails.
    pub const MISSING: Property<Self, i32> = Property::new("missing");

    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn with_number(number: i32) -> Arc<Self> {
        let object = Self::default();
        *object.number.lock() = number;
        Arc::new(object)
    }

    #[must_use]
    pub fn with_text(text: &str) -> Arc<Self> {
        let object = Self::default();
        *object.text.lock() = Some(text.to_owned());
        Arc::new(object)
    }

    #[must_use]
    pub fn number(&self) -> i32 {
        *self.number.lock()
    }

    pub fn set_number(&self, value: i32) {
        self.set_field("number", &self.number, value);
    }

    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.text.lock().clone()
    }

    pub fn set_text(&self, value: Option<&str>) {
        self.set_field("text", &self.text, value.map(str::to_owned));
    }

    #[must_use]
    pub fn fragile(&self) -> i32 {
        *self.fragile.lock()
    }

    /// # Panics
    ///
    /// Panics with [`FRAGILE_PANIC`] for negative values.
    pub fn set_fragile(&self, value: i32) {
        assert!(value >= 0, "{FRAGILE_PANIC}");
        self.set_field("fragile", &self.fragile, value);
    }

    #[must_use]
    pub fn changes(&self) -> u64 {
        self.changes.load(Ordering::SeqCst)
    }

    /// Handlers currently subscribed to `property`.
    #[must_use]
    pub fn subscribers_of(&self, property: &str) -> usize {
        self.events.subscribers_of(property)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    fn set_field<V: PartialEq + Clone>(&self, property: &str, slot: &Mutex<V>, value: V) {
        let previous = slot.lock().clone();
        if previous == value {
            return;
        }
        *slot.lock() = value;
        self.changes.fetch_add(1, Ordering::SeqCst);

        let notified = panic::catch_unwind(AssertUnwindSafe(|| self.events.notify(property)));
        if let Err(payload) = notified {
            *slot.lock() = previous;
            panic::resume_unwind(payload);
        }
    }
}

impl NotifyPropertyChanged for BindingTestObject {
    fn subscribe(&self, property: &str, handler: ChangeHandler) -> SubscriptionId {
        self.events.subscribe(property, handler)
    }

    fn unsubscribe(&self, property: &str, id: SubscriptionId) -> bool {
        self.events.unsubscribe(property, id)
    }
}

impl Bindable for BindingTestObject {
    fn accessors() -> &'static AccessorTable<Self> {
        static TABLE: OnceLock<AccessorTable<BindingTestObject>> = OnceLock::new();
        TABLE.get_or_init(|| {
            AccessorTable::new()
                .with(PropertyAccessors::read_write(
                    "number",
                    Self::number,
                    Self::set_number,
                ))
                .with(PropertyAccessors::read_write(
                    "text",
                    Self::text,
                    |o: &Self, v: Option<String>| o.set_text(v.as_deref()),
                ))
                .with(PropertyAccessors::read_only("changes", Self::changes))
                .with(PropertyAccessors::read_write(
                    "fragile",
                    Self::fragile,
                    Self::set_fragile,
                ))
        })
    }

    fn monitor(&self) -> &EndpointMonitor {
        &self.monitor
    }
}

impl std::fmt::Debug for BindingTestObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingTestObject")
            .field("number", &self.number())
            .field("text", &self.text())
            .field("fragile", &self.fragile())
            .field("changes", &self.changes())
            .finish()
    }
}
