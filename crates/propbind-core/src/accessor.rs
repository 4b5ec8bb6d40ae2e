#![forbid(unsafe_code)]

//! Property references and accessor resolution.
//!
//! Each bindable type publishes one static [`AccessorTable`], which maps
//! property names to typed [`PropertyAccessors`] (an optional getter and an
//! optional setter). A [`Property<O, V>`] constant is the typed reference that
//! callers hand to the binding engine.
//!
//! Resolution runs once, when a binding is constructed. It yields shared
//! [`Getter`]/[`Setter`] capabilities that the engine calls on every update.
//!
//! # Failure Modes
//!
//! | Failure | Error |
//! |---------|-------|
//! | Empty property name | [`BindingError::InvalidArgument`] |
//! | Unknown name, or registered with another value type | [`BindingError::UnresolvedProperty`] |
//! | Missing getter/setter for the requested direction | [`BindingError::NotSupported`] |
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, OnceLock};
//! use parking_lot::Mutex;
//! use propbind_core::accessor::{AccessorTable, Bindable, Property, PropertyAccessors};
//! use propbind_core::notify::{
//!     ChangeHandler, EndpointMonitor, NotifyPropertyChanged, PropertyChangedEvents, SubscriptionId,
//! };
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: Mutex<i32>,
//!     events: PropertyChangedEvents,
//!     monitor: EndpointMonitor,
//! }
//!
//! impl Counter {
//!     const VALUE: Property<Counter, i32> = Property::new("value");
//! }
//!
//! impl NotifyPropertyChanged for Counter {
//!     fn subscribe(&self, property: &str, handler: ChangeHandler) -> SubscriptionId {
//!         self.events.subscribe(property, handler)
//!     }
//!     fn unsubscribe(&self, property: &str, id: SubscriptionId) -> bool {
//!         self.events.unsubscribe(property, id)
//!     }
//! }
//!
//! impl Bindable for Counter {
//!     fn accessors() -> &'static AccessorTable<Self> {
//!         static TABLE: OnceLock<AccessorTable<Counter>> = OnceLock::new();
//!         TABLE.get_or_init(|| {
//!             AccessorTable::new().with(PropertyAccessors::read_write(
//!                 "value",
//!                 |c: &Counter| *c.value.lock(),
//!                 |c: &Counter, v| {
//!                     c.events.assign("value", &c.value, v);
//!                 },
//!             ))
//!         })
//!     }
//!     fn monitor(&self) -> &EndpointMonitor {
//!         &self.monitor
//!     }
//! }
//!
//! let counter = Counter::default();
//! let set = Counter::VALUE.setter().unwrap();
//! let get = Counter::VALUE.getter().unwrap();
//! set(&counter, 9);
//! assert_eq!(get(&counter), 9);
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{AccessDirection, BindingError};
use crate::notify::{EndpointMonitor, NotifyPropertyChanged};

/// Read capability: value ← object.
pub type Getter<O, V> = Arc<dyn Fn(&O) -> V + Send + Sync>;

/// Write capability: (object, value) → ().
pub type Setter<O, V> = Arc<dyn Fn(&O, V) + Send + Sync>;

/// The accessors published for one property of `O` with value type `V`.
pub struct PropertyAccessors<O, V> {
    name: &'static str,
    get: Option<Getter<O, V>>,
    set: Option<Setter<O, V>>,
}

impl<O, V> Clone for PropertyAccessors<O, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<O, V> fmt::Debug for PropertyAccessors<O, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAccessors")
            .field("name", &self.name)
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .finish()
    }
}

impl<O: 'static, V: 'static> PropertyAccessors<O, V> {
    /// A property with neither accessor; add them with the `with_*` methods.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            get: None,
            set: None,
        }
    }

    pub fn read_write(
        name: &'static str,
        get: impl Fn(&O) -> V + Send + Sync + 'static,
        set: impl Fn(&O, V) + Send + Sync + 'static,
    ) -> Self {
        Self::new(name).with_getter(get).with_setter(set)
    }

    pub fn read_only(name: &'static str, get: impl Fn(&O) -> V + Send + Sync + 'static) -> Self {
        Self::new(name).with_getter(get)
    }

    pub fn write_only(name: &'static str, set: impl Fn(&O, V) + Send + Sync + 'static) -> Self {
        Self::new(name).with_setter(set)
    }

    #[must_use]
    pub fn with_getter(mut self, get: impl Fn(&O) -> V + Send + Sync + 'static) -> Self {
        self.get = Some(Arc::new(get));
        self
    }

    #[must_use]
    pub fn with_setter(mut self, set: impl Fn(&O, V) + Send + Sync + 'static) -> Self {
        self.set = Some(Arc::new(set));
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The read capability, or `NotSupported` if the property has none.
    pub fn getter(&self) -> Result<Getter<O, V>, BindingError> {
        self.get.clone().ok_or_else(|| BindingError::NotSupported {
            property: self.name.to_owned(),
            direction: AccessDirection::Get,
        })
    }

    /// The write capability, or `NotSupported` if the property has none.
    pub fn setter(&self) -> Result<Setter<O, V>, BindingError> {
        self.set.clone().ok_or_else(|| BindingError::NotSupported {
            property: self.name.to_owned(),
            direction: AccessDirection::Set,
        })
    }
}

/// Name → accessors registry for the properties of `O`.
pub struct AccessorTable<O> {
    entries: AHashMap<&'static str, Box<dyn Any + Send + Sync>>,
    _owner: PhantomData<fn(&O)>,
}

impl<O> fmt::Debug for AccessorTable<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("AccessorTable")
            .field("owner", &std::any::type_name::<O>())
            .field("properties", &names)
            .finish()
    }
}

impl<O: 'static> Default for AccessorTable<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: 'static> AccessorTable<O> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
            _owner: PhantomData,
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with<V: 'static>(mut self, accessors: PropertyAccessors<O, V>) -> Self {
        self.insert(accessors);
        self
    }

    /// Publish accessors, replacing any previous entry under the same name.
    pub fn insert<V: 'static>(&mut self, accessors: PropertyAccessors<O, V>) {
        self.entries.insert(accessors.name, Box::new(accessors));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the accessors of `name` with value type `V`.
    pub fn resolve<V: 'static>(&self, name: &str) -> Result<&PropertyAccessors<O, V>, BindingError> {
        if name.is_empty() {
            return Err(BindingError::InvalidArgument {
                argument: "property",
                reason: "property name is empty",
            });
        }
        self.entries
            .get(name)
            .and_then(|entry| entry.downcast_ref::<PropertyAccessors<O, V>>())
            .ok_or_else(|| BindingError::UnresolvedProperty {
                owner: std::any::type_name::<O>(),
                property: name.to_owned(),
            })
    }

    /// Resolve the read capability of `name`.
    pub fn getter<V: 'static>(&self, name: &str) -> Result<Getter<O, V>, BindingError> {
        self.resolve::<V>(name)?.getter()
    }

    /// Resolve the write capability of `name`.
    pub fn setter<V: 'static>(&self, name: &str) -> Result<Setter<O, V>, BindingError> {
        self.resolve::<V>(name)?.setter()
    }
}

/// An object type that can be a binding endpoint.
pub trait Bindable: NotifyPropertyChanged + Sized + 'static {
    /// The accessor table shared by every instance of this type.
    fn accessors() -> &'static AccessorTable<Self>;

    /// The monitor guarding this instance during binding updates.
    fn monitor(&self) -> &EndpointMonitor;
}

/// Typed, compile-time reference to property `name` of `O` with value `V`.
pub struct Property<O, V> {
    name: &'static str,
    _types: PhantomData<fn(&O) -> V>,
}

impl<O, V> Property<O, V> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _types: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<O, V> Clone for Property<O, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, V> Copy for Property<O, V> {}

impl<O, V> fmt::Debug for Property<O, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property({}.{})", std::any::type_name::<O>(), self.name)
    }
}

impl<O: Bindable, V: 'static> Property<O, V> {
    /// Resolve this property's read capability.
    pub fn getter(&self) -> Result<Getter<O, V>, BindingError> {
        O::accessors().getter(self.name)
    }

    /// Resolve this property's write capability.
    pub fn setter(&self) -> Result<Setter<O, V>, BindingError> {
        O::accessors().setter(self.name)
    }
}
