#![forbid(unsafe_code)]

//! Binding engine and registry for propbind.
//!
//! # Role in propbind
//! `propbind-runtime` keeps properties of separately owned objects in sync.
//! It builds on the leaf capabilities of `propbind-core` (values, converters,
//! change notification, accessor tables) and adds:
//!
//! - [`TypedBinding`]: one link between `source.property` and
//!   `target.property`, with mode gating, fallback and conversion, a
//!   reentrancy guard, and weak endpoints.
//! - [`BindingManager`]: creates bindings, hands out ids, and drops bindings
//!   whose endpoints have gone away.
//! - [`Dispatcher`]: optional marshalling of updates onto a designated
//!   execution context.
//! - [`BindingConfig`]: manager-wide defaults and the conversion-failure policy.
//!
//! # How it fits in the system
//! Endpoint types implement [`Bindable`](propbind_core::accessor::Bindable)
//! and raise change notifications when their setters run. The manager never
//! polls: every update starts from a notification.
//!
//! # Logging
//! Diagnostics go through `tracing`. Registration and deactivation log at
//! `debug`, each update at `trace` inside a `binding_update` span, conversion
//! failures at `warn`, and failed updates at `error`.

pub mod binding;
pub mod config;
pub mod dispatch;
pub mod manager;
pub mod typed_binding;

pub use binding::{Binding, BindingId, BindingInfo, BindingState, IS_ACTIVE, Lifecycle};
#[cfg(feature = "policy-config")]
pub use config::ConfigError;
pub use config::{BindingConfig, ConversionFailurePolicy};
pub use dispatch::{Dispatcher, InlineDispatcher, ThreadDispatcher, Work};
pub use manager::{BindingBuilder, BindingManager};
pub use typed_binding::{Direction, SharedConverter, TypedBinding};
