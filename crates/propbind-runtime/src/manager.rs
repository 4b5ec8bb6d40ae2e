#![forbid(unsafe_code)]

//! The binding registry.
//!
//! [`BindingManager`] creates bindings, assigns their ids, keeps them alive,
//! and removes them either on request ([`unregister`](BindingManager::unregister))
//! or automatically when a binding deactivates because an endpoint is gone.
//!
//! # Usage
//!
//! ```ignore
//! let manager = BindingManager::new();
//! let id = manager
//!     .bind(&slider, Slider::VALUE, &label, Label::TEXT)
//!     .mode(BindingMode::OneWay)
//!     .converter(NumberToText)
//!     .register()?;
//! // ...
//! manager.unregister(id)?;
//! ```
//!
//! # Invariants
//!
//! 1. Every id in the registry maps to a binding created by this manager.
//! 2. A binding that deactivates is removed from the registry and disposed,
//!    even if deactivation raced with its registration.
//! 3. Registry shard locks are never held while binding code runs.
//!
//! # Failure Modes
//!
//! - Construction errors (type mismatch, unresolvable accessor, empty name)
//!   are returned from `register` and nothing is inserted.
//! - `unregister` of an unknown id returns [`BindingError::NotFound`].
//! - Dropping the manager disposes every binding it still holds.

use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use propbind_core::accessor::{Bindable, Property};
use propbind_core::convert::BindingConverter;
use propbind_core::error::{BindingError, RegistrationError};
use propbind_core::mode::BindingMode;
use propbind_core::notify::{NotifyPropertyChanged, PropertyChanged, SubscriptionId};
use propbind_core::value::PropertyValue;

use crate::binding::{Binding, BindingId, BindingInfo, IS_ACTIVE, next_binding_id};
use crate::config::BindingConfig;
use crate::dispatch::{DispatchSlot, Dispatcher};
use crate::typed_binding::{BindingRequest, SharedConverter, TypedBinding};

struct Registered {
    binding: Arc<dyn Binding>,
    observer: SubscriptionId,
}

#[derive(Default)]
struct Registry {
    entries: DashMap<BindingId, Registered>,
}

impl Registry {
    /// Remove, stop observing, and dispose. `None` if `id` is not registered.
    fn release(&self, id: BindingId) -> Option<Arc<dyn Binding>> {
        let (_, entry) = self.entries.remove(&id)?;
        entry.binding.state().unsubscribe(IS_ACTIVE, entry.observer);
        entry.binding.dispose();
        Some(entry.binding)
    }
}

/// Owns every binding it creates, keyed by [`BindingId`].
pub struct BindingManager {
    registry: Arc<Registry>,
    dispatch: Arc<DispatchSlot>,
    config: BindingConfig,
}

impl Default for BindingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingManager {
    /// A manager with default config and no dispatcher: updates run inline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BindingConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BindingConfig) -> Self {
        Self {
            registry: Arc::new(Registry::default()),
            dispatch: Arc::new(DispatchSlot::new(None)),
            config,
        }
    }

    /// A manager whose bindings run every update through `dispatcher`.
    #[must_use]
    pub fn with_dispatcher(dispatcher: Arc<dyn Dispatcher>) -> Self {
        let manager = Self::new();
        manager.dispatch.set(Some(dispatcher));
        manager
    }

    #[must_use]
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// The dispatcher currently used by this manager's bindings.
    #[must_use]
    pub fn dispatcher(&self) -> Option<Arc<dyn Dispatcher>> {
        self.dispatch.get()
    }

    /// Replace the dispatcher. Applies to updates that start afterwards,
    /// including those of bindings registered earlier.
    pub fn set_dispatcher(&self, dispatcher: Option<Arc<dyn Dispatcher>>) {
        let installed = dispatcher.is_some();
        self.dispatch.set(dispatcher);
        tracing::debug!(installed, "binding dispatcher changed");
    }

    /// Create and register a binding from `source.source_property` to
    /// `target.target_property`.
    ///
    /// Without a converter, `SP` and `TP` must be the same type. The binding
    /// performs its initial synchronization before this returns.
    ///
    /// # Errors
    ///
    /// - [`BindingError::Registration`] on a type mismatch.
    /// - [`BindingError::InvalidArgument`] for an empty property name.
    /// - [`BindingError::UnresolvedProperty`] / [`BindingError::NotSupported`]
    ///   when an accessor the mode needs is missing.
    #[allow(clippy::too_many_arguments)]
    pub fn register<S, SP, T, TP>(
        &self,
        source: &Arc<S>,
        source_property: Property<S, SP>,
        target: &Arc<T>,
        target_property: Property<T, TP>,
        fallback: SP,
        mode: BindingMode,
        converter: Option<SharedConverter<SP, TP>>,
    ) -> Result<BindingId, BindingError>
    where
        S: Bindable,
        T: Bindable,
        SP: PropertyValue,
        TP: PropertyValue,
    {
        let binding = TypedBinding::new(
            next_binding_id(),
            BindingRequest {
                source,
                source_property,
                target,
                target_property,
                fallback,
                mode,
                converter,
                conversion_failure: self.config.conversion_failure,
            },
            Arc::clone(&self.dispatch),
        )?;
        self.adopt(binding)
    }

    /// [`register`](Self::register) with the default fallback, the configured
    /// default mode, and no converter.
    pub fn register_default<S, T, V>(
        &self,
        source: &Arc<S>,
        source_property: Property<S, V>,
        target: &Arc<T>,
        target_property: Property<T, V>,
    ) -> Result<BindingId, BindingError>
    where
        S: Bindable,
        T: Bindable,
        V: PropertyValue,
    {
        self.register(
            source,
            source_property,
            target,
            target_property,
            V::default(),
            self.config.default_mode,
            None,
        )
    }

    /// Start a registration with defaults that can be overridden piecewise.
    pub fn bind<'a, S, SP, T, TP>(
        &'a self,
        source: &'a Arc<S>,
        source_property: Property<S, SP>,
        target: &'a Arc<T>,
        target_property: Property<T, TP>,
    ) -> BindingBuilder<'a, S, SP, T, TP>
    where
        S: Bindable,
        T: Bindable,
        SP: PropertyValue,
        TP: PropertyValue,
    {
        BindingBuilder {
            manager: self,
            source,
            source_property,
            target,
            target_property,
            fallback: SP::default(),
            mode: self.config.default_mode,
            converter: None,
        }
    }

    /// Remove a binding and release everything it holds.
    ///
    /// # Errors
    ///
    /// [`BindingError::NotFound`] if `id` is not registered here.
    pub fn unregister(&self, id: BindingId) -> Result<(), BindingError> {
        match self.registry.release(id) {
            Some(_) => {
                tracing::debug!(binding_id = id, "binding unregistered");
                Ok(())
            }
            None => Err(BindingError::NotFound(id)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: BindingId) -> bool {
        self.registry.entries.contains_key(&id)
    }

    /// Registered ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<BindingId> {
        let mut ids: Vec<_> = self.registry.entries.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn describe(&self, id: BindingId) -> Option<BindingInfo> {
        self.registry.entries.get(&id).map(|e| e.binding.info())
    }

    /// Descriptions of every registered binding, by ascending id.
    #[must_use]
    pub fn bindings(&self) -> Vec<BindingInfo> {
        let mut infos: Vec<_> = self
            .registry
            .entries
            .iter()
            .map(|e| e.binding.info())
            .collect();
        infos.sort_unstable_by_key(|info| info.id);
        infos
    }

    /// Unregister every binding. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = self
            .ids()
            .into_iter()
            .filter(|id| self.registry.release(*id).is_some())
            .count();
        if removed > 0 {
            tracing::debug!(removed, "binding registry cleared");
        }
        removed
    }

    fn adopt(&self, binding: Arc<dyn Binding>) -> Result<BindingId, BindingError> {
        let id = binding.id();
        let registry: Weak<Registry> = Arc::downgrade(&self.registry);
        let observer = binding.state().subscribe(
            IS_ACTIVE,
            Arc::new(move |_: &PropertyChanged<'_>| {
                let Some(registry) = registry.upgrade() else {
                    return;
                };
                if registry.release(id).is_some() {
                    tracing::debug!(binding_id = id, "binding unregistered after losing an endpoint");
                }
            }),
        );

        match self.registry.entries.entry(id) {
            Entry::Occupied(_) => {
                binding.state().unsubscribe(IS_ACTIVE, observer);
                binding.dispose();
                return Err(RegistrationError::DuplicateId(id).into());
            }
            Entry::Vacant(slot) => {
                slot.insert(Registered {
                    binding: Arc::clone(&binding),
                    observer,
                });
            }
        }

        let info = binding.info();
        tracing::debug!(binding_id = id, binding = %info, "binding registered");

        // Deactivation before the observer was attached went unseen.
        if !binding.is_active() {
            self.registry.release(id);
        }
        Ok(id)
    }
}

impl Drop for BindingManager {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingManager")
            .field("bindings", &self.len())
            .field("dispatcher", &self.dispatch)
            .field("config", &self.config)
            .finish()
    }
}

/// Partial registration; see [`BindingManager::bind`].
#[must_use = "a binding is only created by `register`"]
pub struct BindingBuilder<'a, S, SP, T, TP> {
    manager: &'a BindingManager,
    source: &'a Arc<S>,
    source_property: Property<S, SP>,
    target: &'a Arc<T>,
    target_property: Property<T, TP>,
    fallback: SP,
    mode: BindingMode,
    converter: Option<SharedConverter<SP, TP>>,
}

impl<S, SP, T, TP> BindingBuilder<'_, S, SP, T, TP>
where
    S: Bindable,
    T: Bindable,
    SP: PropertyValue,
    TP: PropertyValue,
{
    /// Value substituted when the origin property reads as absent.
    pub fn fallback(mut self, fallback: SP) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn mode(mut self, mode: BindingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn converter(self, converter: impl BindingConverter<SP, TP> + 'static) -> Self {
        self.shared_converter(Arc::new(converter))
    }

    /// Use a converter instance shared with other bindings.
    pub fn shared_converter(mut self, converter: SharedConverter<SP, TP>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Create the binding. Same errors as [`BindingManager::register`].
    pub fn register(self) -> Result<BindingId, BindingError> {
        self.manager.register(
            self.source,
            self.source_property,
            self.target,
            self.target_property,
            self.fallback,
            self.mode,
            self.converter,
        )
    }
}
