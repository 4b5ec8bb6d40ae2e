#![forbid(unsafe_code)]

//! propbind: keep properties of independently owned objects in sync.
//!
//! A [`BindingManager`] links `source.property` to `target.property` in one of
//! three [`BindingMode`]s. Each binding listens for change notifications,
//! converts values through an optional [`BindingConverter`], substitutes a
//! fallback for absent reads, suppresses its own echo, and quietly removes
//! itself once either endpoint has been dropped.
//!
//! Endpoints implement [`Bindable`]: they publish an [`AccessorTable`] of
//! named getters and setters and raise notifications through
//! [`NotifyPropertyChanged`].
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, OnceLock};
//! use parking_lot::Mutex;
//! use propbind::prelude::*;
//!
//! #[derive(Default)]
//! struct Slider {
//!     value: Mutex<i32>,
//!     events: PropertyChangedEvents,
//!     monitor: EndpointMonitor,
//! }
//!
//! impl Slider {
//!     const VALUE: Property<Slider, i32> = Property::new("value");
//!
//!     fn value(&self) -> i32 {
//!         *self.value.lock()
//!     }
//!
//!     fn set_value(&self, v: i32) {
//!         self.events.assign("value", &self.value, v);
//!     }
//! }
//!
//! impl NotifyPropertyChanged for Slider {
//!     fn subscribe(&self, property: &str, handler: ChangeHandler) -> SubscriptionId {
//!         self.events.subscribe(property, handler)
//!     }
//!     fn unsubscribe(&self, property: &str, id: SubscriptionId) -> bool {
//!         self.events.unsubscribe(property, id)
//!     }
//! }
//!
//! impl Bindable for Slider {
//!     fn accessors() -> &'static AccessorTable<Self> {
//!         static TABLE: OnceLock<AccessorTable<Slider>> = OnceLock::new();
//!         TABLE.get_or_init(|| {
//!             AccessorTable::new().with(PropertyAccessors::read_write(
//!                 "value",
//!                 Slider::value,
//!                 Slider::set_value,
//!             ))
//!         })
//!     }
//!     fn monitor(&self) -> &EndpointMonitor {
//!         &self.monitor
//!     }
//! }
//!
//! let manager = BindingManager::new();
//! let a = Arc::new(Slider::default());
//! let b = Arc::new(Slider::default());
//! let id = manager.register_default(&a, Slider::VALUE, &b, Slider::VALUE)?;
//!
//! a.set_value(7);
//! assert_eq!(b.value(), 7);
//! b.set_value(-2);
//! assert_eq!(a.value(), -2);
//!
//! manager.unregister(id)?;
//! # Ok::<(), BindingError>(())
//! ```

pub use propbind_core::{
    AccessDirection, AccessorTable, Bindable, BindingConverter, BindingError, BindingMode,
    ChangeHandler, ConversionError, EndpointMonitor, FnConverter, Getter, IdentityConverter,
    NotifyPropertyChanged, Property, PropertyAccessors, PropertyChanged, PropertyChangedEvents,
    PropertyValue, RegistrationError, Setter, SubscriptionId, TypeTag, converter_fn,
};
#[cfg(feature = "policy-config")]
pub use propbind_runtime::ConfigError;
pub use propbind_runtime::{
    Binding, BindingBuilder, BindingConfig, BindingId, BindingInfo, BindingManager,
    ConversionFailurePolicy, Direction, Dispatcher, InlineDispatcher, Lifecycle, ThreadDispatcher,
    TypedBinding,
};

/// Everything needed to declare endpoints and register bindings.
pub mod prelude {
    pub use propbind_core::{
        AccessorTable, Bindable, BindingConverter, BindingError, BindingMode, ChangeHandler,
        ConversionError, EndpointMonitor, NotifyPropertyChanged, Property, PropertyAccessors,
        PropertyChanged, PropertyChangedEvents, PropertyValue, SubscriptionId, converter_fn,
    };
    pub use propbind_runtime::{
        BindingConfig, BindingId, BindingManager, ConversionFailurePolicy, Dispatcher,
        ThreadDispatcher,
    };
}
