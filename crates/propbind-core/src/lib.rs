#![forbid(unsafe_code)]

//! Core capabilities for propbind.
//!
//! This crate holds the leaf pieces the binding engine consumes:
//!
//! - [`value`]: the [`PropertyValue`](value::PropertyValue) contract for bound
//!   property types, "absent" detection, and [`TypeTag`](value::TypeTag).
//! - [`mode`]: [`BindingMode`](mode::BindingMode) (direction of propagation).
//! - [`convert`]: the bidirectional [`BindingConverter`](convert::BindingConverter)
//!   capability plus the identity pass-through.
//! - [`notify`]: the named-property change-notification interface, a ready-made
//!   event hub, and the per-object [`EndpointMonitor`](notify::EndpointMonitor).
//! - [`accessor`]: typed property references, per-type accessor tables, and
//!   one-time resolution into get/set capabilities.
//! - [`error`]: the error kinds surfaced at registration time.
//!
//! The engine itself ([`TypedBinding`], `BindingManager`) lives in
//! `propbind-runtime`.
//!
//! [`TypedBinding`]: https://docs.rs/propbind-runtime

pub mod accessor;
pub mod convert;
pub mod error;
pub mod mode;
pub mod notify;
pub mod value;

pub use accessor::{AccessorTable, Bindable, Getter, Property, PropertyAccessors, Setter};
pub use convert::{BindingConverter, FnConverter, IdentityConverter, converter_fn};
pub use error::{AccessDirection, BindingError, ConversionError, RegistrationError};
pub use mode::BindingMode;
pub use notify::{
    ChangeHandler, EndpointMonitor, MonitorGuard, NotifyPropertyChanged, PropertyChanged,
    PropertyChangedEvents, SubscriptionId,
};
pub use value::{PropertyValue, TypeTag};
