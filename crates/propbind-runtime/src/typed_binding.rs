#![forbid(unsafe_code)]

//! The propagation engine: one typed binding between two endpoint properties.
//!
//! [`TypedBinding<S, SP, T, TP>`] connects property `SP` of a source object `S`
//! to property `TP` of a target object `T`. It resolves the accessors its
//! [`BindingMode`] needs, subscribes to the relevant change notifications, and
//! runs the read-convert-write sequence whenever a subscribed property changes.
//!
//! # Update algorithm
//!
//! 1. Upgrade both weak endpoint references. If either endpoint is gone, the
//!    binding deactivates and the update stops. This is the only liveness check.
//! 2. Enter the source monitor, then the target monitor.
//! 3. Read the origin property.
//! 4. An absent read is replaced by the fallback value. A value that is still
//!    absent becomes the destination type's default. Anything else goes
//!    through the converter.
//! 5. A failed conversion writes the destination type's default (or, under
//!    [`ConversionFailurePolicy::Fallback`], the fallback).
//! 6. Write the destination property.
//! 7. Leave both monitors (RAII, on every exit path).
//!
//! # Reentrancy
//!
//! Each change handler first tries the binding's coordination lock without
//! blocking and then raises the updating flag. If either is taken, another
//! update of this binding is in flight (possibly the one whose write caused
//! this notification) and the trigger is dropped, not queued.
//!
//! # Invariants
//!
//! 1. Only the accessors required by the mode are resolved; the others are
//!    `None` and never called.
//! 2. At most one read-convert-write runs per binding at any instant.
//! 3. The binding holds only `Weak` references to its endpoints.
//! 4. After [`dispose`](Binding::dispose) the binding holds no endpoint,
//!    converter, or accessor references and no endpoint subscriptions.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use propbind_core::accessor::{Bindable, Getter, Property, Setter};
use propbind_core::convert::{BindingConverter, IdentityConverter};
use propbind_core::error::{BindingError, ConversionError, RegistrationError};
use propbind_core::mode::BindingMode;
use propbind_core::notify::{PropertyChanged, SubscriptionId};
use propbind_core::value::{PropertyValue, TypeTag};

use crate::binding::{Binding, BindingId, BindingState};
use crate::config::ConversionFailurePolicy;
use crate::dispatch::{DispatchSlot, UpdateScope};

/// Shared converter handle as stored by a binding.
pub type SharedConverter<SP, TP> = Arc<dyn BindingConverter<SP, TP>>;

/// Which way a single update flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    SourceToTarget,
    TargetToSource,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SourceToTarget => "source->target",
            Self::TargetToSource => "target->source",
        })
    }
}

/// Fail with `TypeMismatch` unless a converter is present or `SP == TP`.
pub(crate) fn check_compatible<SP: 'static, TP: 'static>(
    has_converter: bool,
) -> Result<(), BindingError> {
    if has_converter || TypeTag::of::<SP>() == TypeTag::of::<TP>() {
        return Ok(());
    }
    Err(RegistrationError::TypeMismatch {
        source_type: std::any::type_name::<SP>(),
        target_type: std::any::type_name::<TP>(),
    }
    .into())
}

/// Everything needed to construct a [`TypedBinding`].
pub(crate) struct BindingRequest<'a, S, SP, T, TP> {
    pub(crate) source: &'a Arc<S>,
    pub(crate) source_property: Property<S, SP>,
    pub(crate) target: &'a Arc<T>,
    pub(crate) target_property: Property<T, TP>,
    pub(crate) fallback: SP,
    pub(crate) mode: BindingMode,
    pub(crate) converter: Option<SharedConverter<SP, TP>>,
    pub(crate) conversion_failure: ConversionFailurePolicy,
}

/// Endpoint references and resolved capabilities. Dropped as a unit on
/// disposal; updates already in flight keep their own snapshot.
struct Wiring<S, SP, T, TP> {
    source: Weak<S>,
    target: Weak<T>,
    converter: SharedConverter<SP, TP>,
    source_get: Option<Getter<S, SP>>,
    target_set: Option<Setter<T, TP>>,
    source_set: Option<Setter<S, SP>>,
    target_get: Option<Getter<T, TP>>,
}

#[derive(Debug, Default)]
struct EndpointSubscriptions {
    source: Option<SubscriptionId>,
    target: Option<SubscriptionId>,
}

/// A binding between `S.SP` and `T.TP`.
pub struct TypedBinding<S, SP, T, TP> {
    state: BindingState,
    coordination: Mutex<()>,
    fallback: SP,
    conversion_failure: ConversionFailurePolicy,
    dispatch: Arc<DispatchSlot>,
    wiring: ArcSwapOption<Wiring<S, SP, T, TP>>,
    subscriptions: Mutex<EndpointSubscriptions>,
}

impl<S, SP, T, TP> TypedBinding<S, SP, T, TP>
where
    S: Bindable,
    T: Bindable,
    SP: PropertyValue,
    TP: PropertyValue,
{
    /// Resolve accessors, subscribe, and perform the initial synchronization.
    ///
    /// The returned binding is `Active`. On error nothing stays subscribed.
    pub(crate) fn new(
        id: BindingId,
        request: BindingRequest<'_, S, SP, T, TP>,
        dispatch: Arc<DispatchSlot>,
    ) -> Result<Arc<Self>, BindingError> {
        let BindingRequest {
            source,
            source_property,
            target,
            target_property,
            fallback,
            mode,
            converter,
            conversion_failure,
        } = request;

        check_compatible::<SP, TP>(converter.is_some())?;
        if source_property.name().is_empty() {
            return Err(BindingError::InvalidArgument {
                argument: "source_property",
                reason: "property name is empty",
            });
        }
        if target_property.name().is_empty() {
            return Err(BindingError::InvalidArgument {
                argument: "target_property",
                reason: "property name is empty",
            });
        }

        let (source_get, target_set) = if mode.updates_target() {
            (
                Some(source_property.getter()?),
                Some(target_property.setter()?),
            )
        } else {
            (None, None)
        };
        let (source_set, target_get) = if mode.updates_source() {
            (
                Some(source_property.setter()?),
                Some(target_property.getter()?),
            )
        } else {
            (None, None)
        };

        let converter: SharedConverter<SP, TP> = match converter {
            Some(converter) => converter,
            None => Arc::new(IdentityConverter::<SP, TP>::new()),
        };

        let binding = Arc::new(Self {
            state: BindingState::new(
                id,
                mode,
                (source_property.name(), TypeTag::of::<S>()),
                (target_property.name(), TypeTag::of::<T>()),
            ),
            coordination: Mutex::new(()),
            fallback,
            conversion_failure,
            dispatch,
            wiring: ArcSwapOption::new(Some(Arc::new(Wiring {
                source: Arc::downgrade(source),
                target: Arc::downgrade(target),
                converter,
                source_get,
                target_set,
                source_set,
                target_get,
            }))),
            subscriptions: Mutex::new(EndpointSubscriptions::default()),
        });

        if mode.updates_target() {
            let weak = Arc::downgrade(&binding);
            let sid = source.subscribe(
                source_property.name(),
                Arc::new(move |_: &PropertyChanged<'_>| {
                    if let Some(binding) = weak.upgrade() {
                        binding.on_source_changed();
                    }
                }),
            );
            binding.subscriptions.lock().source = Some(sid);
        }
        if mode.updates_source() {
            let weak = Arc::downgrade(&binding);
            let sid = target.subscribe(
                target_property.name(),
                Arc::new(move |_: &PropertyChanged<'_>| {
                    if let Some(binding) = weak.upgrade() {
                        binding.on_target_changed();
                    }
                }),
            );
            binding.subscriptions.lock().target = Some(sid);
        }

        // TwoWay is already consistent after the source → target pass.
        let initial = panic::catch_unwind(AssertUnwindSafe(|| {
            if mode.updates_target() {
                binding.on_source_changed();
            } else {
                binding.on_target_changed();
            }
        }));
        if let Err(payload) = initial {
            binding.dispose();
            panic::resume_unwind(payload);
        }

        binding.state.activate();
        Ok(binding)
    }

    /// Value substituted when the origin property reads as absent.
    #[must_use]
    pub fn fallback_value(&self) -> &SP {
        &self.fallback
    }

    #[must_use]
    pub fn mode(&self) -> BindingMode {
        self.state.mode()
    }

    /// Whether disposal has released the endpoint references.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.wiring.load().is_none()
    }

    /// Handler for source change notifications.
    pub(crate) fn on_source_changed(self: &Arc<Self>) {
        if self.state.mode().updates_target() {
            self.propagate(Direction::SourceToTarget);
        }
    }

    /// Handler for target change notifications.
    pub(crate) fn on_target_changed(self: &Arc<Self>) {
        if self.state.mode().updates_source() {
            self.propagate(Direction::TargetToSource);
        }
    }

    fn propagate(self: &Arc<Self>, direction: Direction) {
        let Some(_token) = self.coordination.try_lock() else {
            tracing::trace!(
                binding_id = self.state.id(),
                %direction,
                "update in flight; trigger dropped"
            );
            return;
        };
        let Some(_updating) = self.state.begin_update() else {
            return;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let this = Arc::clone(self);
            self.dispatch.execute(move || this.update(direction));
        }));

        if let Err(payload) = outcome {
            let (from, to) = self.describe(direction);
            tracing::error!(
                binding_id = self.state.id(),
                %direction,
                "update of {from} to {to} failed; {from} should be reverted to avoid inconsistent states"
            );
            panic::resume_unwind(payload);
        }
    }

    fn describe(&self, direction: Direction) -> (String, String) {
        let source = format!(
            "{}.{}",
            self.state.source_type().short_name(),
            self.state.source_property()
        );
        let target = format!(
            "{}.{}",
            self.state.target_type().short_name(),
            self.state.target_property()
        );
        match direction {
            Direction::SourceToTarget => (source, target),
            Direction::TargetToSource => (target, source),
        }
    }

    /// Liveness check, monitors, then the directional read-convert-write.
    fn update(&self, direction: Direction) {
        let Some(wiring) = self.wiring.load_full() else {
            return;
        };
        let source = wiring.source.upgrade();
        let target = wiring.target.upgrade();
        let (Some(source), Some(target)) = (source, target) else {
            self.state.deactivate();
            return;
        };

        let _span = tracing::trace_span!(
            "binding_update",
            binding_id = self.state.id(),
            %direction
        )
        .entered();
        let _scope = UpdateScope::enter();
        let _source_monitor = source.monitor().enter();
        let _target_monitor = target.monitor().enter();

        match direction {
            Direction::SourceToTarget => self.update_target_from_source(&wiring, &source, &target),
            Direction::TargetToSource => self.update_source_from_target(&wiring, &source, &target),
        }
    }

    fn update_target_from_source(&self, wiring: &Wiring<S, SP, T, TP>, source: &S, target: &T) {
        let (Some(get), Some(set)) = (&wiring.source_get, &wiring.target_set) else {
            return;
        };
        let raw = get(source);
        let converted = self.convert_to_target(wiring.converter.as_ref(), raw);
        tracing::trace!(binding_id = self.state.id(), "target updated from source");
        set(target, converted);
    }

    fn update_source_from_target(&self, wiring: &Wiring<S, SP, T, TP>, source: &S, target: &T) {
        let (Some(get), Some(set)) = (&wiring.target_get, &wiring.source_set) else {
            return;
        };
        let raw = get(target);
        let converted = self.convert_to_source(wiring.converter.as_ref(), raw);
        tracing::trace!(binding_id = self.state.id(), "source updated from target");
        set(source, converted);
    }

    fn convert_to_target(&self, converter: &dyn BindingConverter<SP, TP>, raw: SP) -> TP {
        let used_fallback = raw.is_absent();
        let value = if used_fallback {
            self.fallback.clone()
        } else {
            raw
        };
        if value.is_absent() {
            return TP::default();
        }
        match converter.source_to_target(value) {
            Ok(converted) => converted,
            Err(err) => {
                self.conversion_failed(Direction::SourceToTarget, &err);
                match self.conversion_failure {
                    ConversionFailurePolicy::TypeDefault => TP::default(),
                    // The fallback itself just failed; converting it again cannot help.
                    ConversionFailurePolicy::Fallback if used_fallback => TP::default(),
                    ConversionFailurePolicy::Fallback if self.fallback.is_absent() => TP::default(),
                    ConversionFailurePolicy::Fallback => converter
                        .source_to_target(self.fallback.clone())
                        .unwrap_or_default(),
                }
            }
        }
    }

    fn convert_to_source(&self, converter: &dyn BindingConverter<SP, TP>, raw: TP) -> SP {
        if raw.is_absent() {
            return self.fallback.clone();
        }
        match converter.target_to_source(raw) {
            Ok(converted) => converted,
            Err(err) => {
                self.conversion_failed(Direction::TargetToSource, &err);
                match self.conversion_failure {
                    ConversionFailurePolicy::TypeDefault => SP::default(),
                    ConversionFailurePolicy::Fallback => self.fallback.clone(),
                }
            }
        }
    }

    fn conversion_failed(&self, direction: Direction, err: &ConversionError) {
        tracing::warn!(
            binding_id = self.state.id(),
            %direction,
            error = %err,
            policy = ?self.conversion_failure,
            "conversion failed; writing substitute value"
        );
    }
}

impl<S, SP, T, TP> Binding for TypedBinding<S, SP, T, TP>
where
    S: Bindable,
    T: Bindable,
    SP: PropertyValue,
    TP: PropertyValue,
{
    fn state(&self) -> &BindingState {
        &self.state
    }

    fn dispose(&self) {
        let wiring = self.wiring.swap(None);
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        self.state.deactivate();

        let Some(wiring) = wiring else {
            return;
        };
        if let (Some(sid), Some(source)) = (subscriptions.source, wiring.source.upgrade()) {
            source.unsubscribe(self.state.source_property(), sid);
        }
        if let (Some(sid), Some(target)) = (subscriptions.target, wiring.target.upgrade()) {
            target.unsubscribe(self.state.target_property(), sid);
        }
        tracing::debug!(binding_id = self.state.id(), "binding disposed");
    }
}

impl<S, SP, T, TP> fmt::Debug for TypedBinding<S, SP, T, TP>
where
    SP: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedBinding")
            .field("state", &self.state)
            .field("fallback", &self.fallback)
            .field("disposed", &self.wiring.load().is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Lifecycle, next_binding_id};
    use propbind_core::accessor::{AccessorTable, PropertyAccessors};
    use propbind_core::convert::converter_fn;
    use propbind_core::notify::{
        ChangeHandler, EndpointMonitor, NotifyPropertyChanged, PropertyChangedEvents,
    };
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Knob {
        level: Mutex<i32>,
        caption: Mutex<Option<String>>,
        writes: AtomicUsize,
        events: PropertyChangedEvents,
        monitor: EndpointMonitor,
    }

    impl Knob {
        const LEVEL: Property<Knob, i32> = Property::new("level");
        const CAPTION: Property<Knob, Option<String>> = Property::new("caption");
        const SERIAL: Property<Knob, i32> = Property::new("serial");

        fn with_level(level: i32) -> Arc<Self> {
            let knob = Self::default();
            *knob.level.lock() = level;
            Arc::new(knob)
        }

        fn level(&self) -> i32 {
            *self.level.lock()
        }

        fn set_level(&self, v: i32) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.events.assign("level", &self.level, v);
        }

        fn caption(&self) -> Option<String> {
            self.caption.lock().clone()
        }

        fn set_caption(&self, v: Option<String>) {
            self.events.assign("caption", &self.caption, v);
        }
    }

    impl NotifyPropertyChanged for Knob {
        fn subscribe(&self, property: &str, handler: ChangeHandler) -> SubscriptionId {
            self.events.subscribe(property, handler)
        }

        fn unsubscribe(&self, property: &str, id: SubscriptionId) -> bool {
            self.events.unsubscribe(property, id)
        }
    }

    impl Bindable for Knob {
        fn accessors() -> &'static AccessorTable<Self> {
            static TABLE: OnceLock<AccessorTable<Knob>> = OnceLock::new();
            TABLE.get_or_init(|| {
                AccessorTable::new()
                    .with(PropertyAccessors::read_write("level", Knob::level, Knob::set_level))
                    .with(PropertyAccessors::read_write(
                        "caption",
                        Knob::caption,
                        Knob::set_caption,
                    ))
                    .with(PropertyAccessors::read_only("serial", |_: &Knob| 7))
            })
        }

        fn monitor(&self) -> &EndpointMonitor {
            &self.monitor
        }
    }

    fn caption_to_level() -> SharedConverter<Option<String>, i32> {
        Arc::new(converter_fn(
            |s: Option<String>| {
                s.ok_or_else(|| ConversionError::new::<i32>("no caption"))?
                    .trim()
                    .parse::<i32>()
                    .map_err(ConversionError::from_error::<i32>)
            },
            |n: i32| Ok(Some(n.to_string())),
        ))
    }

    fn build<SP: PropertyValue, TP: PropertyValue>(
        source: &Arc<Knob>,
        sp: Property<Knob, SP>,
        target: &Arc<Knob>,
        tp: Property<Knob, TP>,
        fallback: SP,
        mode: BindingMode,
        converter: Option<SharedConverter<SP, TP>>,
    ) -> Result<Arc<TypedBinding<Knob, SP, Knob, TP>>, BindingError> {
        TypedBinding::new(
            next_binding_id(),
            BindingRequest {
                source,
                source_property: sp,
                target,
                target_property: tp,
                fallback,
                mode,
                converter,
                conversion_failure: ConversionFailurePolicy::TypeDefault,
            },
            Arc::new(DispatchSlot::new(None)),
        )
    }

    #[test]
    fn one_way_initial_sync_then_propagates() {
        let source = Knob::with_level(-1);
        let target = Knob::with_level(200);
        let binding = build(&source, Knob::LEVEL, &target, Knob::LEVEL, 0, BindingMode::OneWay, None)
            .unwrap();

        assert_eq!(target.level(), -1);
        assert_eq!(binding.state().lifecycle(), Lifecycle::Active);

        source.set_level(99);
        assert_eq!(target.level(), 99);

        target.set_level(66);
        assert_eq!(source.level(), 99, "one-way never writes back");
    }

    #[test]
    fn one_way_to_source_syncs_from_target() {
        let source = Knob::with_level(1);
        let target = Knob::with_level(5);
        let _binding = build(
            &source,
            Knob::LEVEL,
            &target,
            Knob::LEVEL,
            0,
            BindingMode::OneWayToSource,
            None,
        )
        .unwrap();

        assert_eq!(source.level(), 5);
        target.set_level(8);
        assert_eq!(source.level(), 8);
        source.set_level(3);
        assert_eq!(target.level(), 8);
        assert_eq!(source.events.subscribers_of("level"), 0, "no source subscription");
    }

    #[test]
    fn two_way_performs_single_initial_sync() {
        let source = Knob::with_level(4);
        let target = Knob::with_level(0);
        let _binding =
            build(&source, Knob::LEVEL, &target, Knob::LEVEL, 0, BindingMode::TwoWay, None).unwrap();

        assert_eq!(target.level(), 4);
        assert_eq!(target.writes.load(Ordering::SeqCst), 1);
        assert_eq!(source.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn echo_is_suppressed_for_two_way() {
        let source = Knob::with_level(0);
        let target = Knob::with_level(0);
        let _binding =
            build(&source, Knob::LEVEL, &target, Knob::LEVEL, 0, BindingMode::TwoWay, None).unwrap();

        source.set_level(10);
        // One write by the caller, none echoed back.
        assert_eq!(source.writes.load(Ordering::SeqCst), 1);
        assert_eq!(target.level(), 10);
    }

    #[test]
    fn absent_source_uses_fallback_before_converting() {
        let source = Arc::new(Knob::default());
        let target = Knob::with_level(9);
        let _binding = build(
            &source,
            Knob::CAPTION,
            &target,
            Knob::LEVEL,
            Some("12".to_string()),
            BindingMode::OneWay,
            Some(caption_to_level()),
        )
        .unwrap();
        assert_eq!(target.level(), 12);
    }

    #[test]
    fn absent_source_without_fallback_writes_default() {
        let source = Arc::new(Knob::default());
        let target = Knob::with_level(9);
        let _binding = build(
            &source,
            Knob::CAPTION,
            &target,
            Knob::LEVEL,
            None,
            BindingMode::OneWay,
            Some(caption_to_level()),
        )
        .unwrap();
        assert_eq!(target.level(), 0);
    }

    #[test]
    fn conversion_failure_writes_type_default_not_fallback() {
        let source = Arc::new(Knob::default());
        let target = Knob::with_level(9);
        let _binding = build(
            &source,
            Knob::CAPTION,
            &target,
            Knob::LEVEL,
            Some("12".to_string()),
            BindingMode::OneWay,
            Some(caption_to_level()),
        )
        .unwrap();

        source.set_caption(Some("Toasty".into()));
        assert_eq!(target.level(), 0);
    }

    #[test]
    fn fallback_policy_uses_fallback_on_conversion_failure() {
        let source = Arc::new(Knob::default());
        let target = Knob::with_level(9);
        let binding = TypedBinding::new(
            next_binding_id(),
            BindingRequest {
                source: &source,
                source_property: Knob::CAPTION,
                target: &target,
                target_property: Knob::LEVEL,
                fallback: Some("12".to_string()),
                mode: BindingMode::TwoWay,
                converter: Some(caption_to_level()),
                conversion_failure: ConversionFailurePolicy::Fallback,
            },
            Arc::new(DispatchSlot::new(None)),
        )
        .unwrap();

        source.set_caption(Some("Toasty".into()));
        assert_eq!(target.level(), 12);
        assert_eq!(binding.fallback_value().as_deref(), Some("12"));
    }

    #[test]
    fn failing_fallback_is_converted_once_per_update() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let rejecting: SharedConverter<Option<String>, i32> = Arc::new(converter_fn(
            move |_: Option<String>| {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ConversionError::new::<i32>("rejected"))
            },
            |n: i32| Ok(Some(n.to_string())),
        ));
        let source = Arc::new(Knob::default());
        let target = Knob::with_level(9);
        let _binding = TypedBinding::new(
            next_binding_id(),
            BindingRequest {
                source: &source,
                source_property: Knob::CAPTION,
                target: &target,
                target_property: Knob::LEVEL,
                fallback: Some("nope".to_string()),
                mode: BindingMode::OneWay,
                converter: Some(rejecting),
                conversion_failure: ConversionFailurePolicy::Fallback,
            },
            Arc::new(DispatchSlot::new(None)),
        )
        .unwrap();

        // Absent caption: the fallback is what failed, so no second attempt.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(target.level(), 0);

        // Present caption: one attempt for the value, one for the fallback.
        source.set_caption(Some("x".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(target.level(), 0);
    }

    #[test]
    fn mismatched_types_without_converter_fail() {
        let source = Knob::with_level(1);
        let target = Knob::with_level(1);
        let err = build(&source, Knob::LEVEL, &target, Knob::CAPTION, 0, BindingMode::OneWay, None)
            .unwrap_err();
        assert!(err.is_registration());
        assert_eq!(source.events.subscriber_count(), 0);
        assert_eq!(target.events.subscriber_count(), 0);
    }

    #[test]
    fn read_only_target_rejects_one_way() {
        let source = Knob::with_level(1);
        let target = Knob::with_level(1);
        let err = build(&source, Knob::LEVEL, &target, Knob::SERIAL, 0, BindingMode::OneWay, None)
            .unwrap_err();
        assert!(matches!(err, BindingError::NotSupported { .. }));
    }

    #[test]
    fn read_only_source_allows_one_way() {
        let source = Knob::with_level(1);
        let target = Knob::with_level(1);
        let _binding =
            build(&source, Knob::SERIAL, &target, Knob::LEVEL, 0, BindingMode::OneWay, None).unwrap();
        assert_eq!(target.level(), 7);
    }

    #[test]
    fn empty_property_name_is_invalid_argument() {
        let source = Knob::with_level(1);
        let target = Knob::with_level(1);
        let err = build(
            &source,
            Property::<Knob, i32>::new(""),
            &target,
            Knob::LEVEL,
            0,
            BindingMode::OneWay,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BindingError::InvalidArgument {
                argument: "source_property",
                ..
            }
        ));
    }

    #[test]
    fn dropped_endpoint_deactivates_on_next_update() {
        let source = Knob::with_level(1);
        let target = Knob::with_level(0);
        let binding =
            build(&source, Knob::LEVEL, &target, Knob::LEVEL, 0, BindingMode::TwoWay, None).unwrap();
        assert!(binding.is_active());

        drop(target);
        assert!(binding.is_active(), "liveness is discovered lazily");

        source.set_level(2);
        assert_eq!(binding.state().lifecycle(), Lifecycle::Deactivated);
    }

    #[test]
    fn dispose_unsubscribes_and_releases() {
        let source = Knob::with_level(1);
        let target = Knob::with_level(0);
        let binding =
            build(&source, Knob::LEVEL, &target, Knob::LEVEL, 0, BindingMode::TwoWay, None).unwrap();
        assert_eq!(source.events.subscribers_of("level"), 1);
        assert_eq!(target.events.subscribers_of("level"), 1);

        binding.dispose();
        assert!(binding.is_disposed());
        assert!(!binding.is_active());
        assert_eq!(source.events.subscriber_count(), 0);
        assert_eq!(target.events.subscriber_count(), 0);

        source.set_level(50);
        assert_eq!(target.level(), 1);

        binding.dispose();
    }

    #[test]
    fn binding_never_keeps_endpoints_alive() {
        let source = Knob::with_level(1);
        let target = Knob::with_level(0);
        let _binding =
            build(&source, Knob::LEVEL, &target, Knob::LEVEL, 0, BindingMode::TwoWay, None).unwrap();
        assert_eq!(Arc::strong_count(&source), 1);
        assert_eq!(Arc::strong_count(&target), 1);
    }

    #[test]
    fn same_object_binding_does_not_deadlock() {
        let knob = Arc::new(Knob::default());
        let _binding = build(
            &knob,
            Knob::LEVEL,
            &knob,
            Knob::CAPTION,
            0,
            BindingMode::TwoWay,
            Some(Arc::new(converter_fn(
                |n: i32| Ok::<_, ConversionError>(Some(n.to_string())),
                |s: Option<String>| {
                    s.unwrap_or_default()
                        .parse::<i32>()
                        .map_err(ConversionError::from_error::<i32>)
                },
            ))),
        )
        .unwrap();

        knob.set_level(31);
        assert_eq!(knob.caption().as_deref(), Some("31"));
        knob.set_caption(Some("-4".into()));
        assert_eq!(knob.level(), -4);
    }
}
