#![forbid(unsafe_code)]

//! Identity and lifecycle state shared by every binding.
//!
//! [`BindingState`] is the common part of a binding: its id, the names and
//! endpoint types it connects, its [`BindingMode`], the active/updating flags,
//! and an event hub that announces deactivation. [`Binding`] is the object-safe
//! trait the registry stores, whatever the concrete endpoint and property types.
//!
//! # Lifecycle
//!
//! ```text
//! Constructing ──activate──▶ Active ──deactivate──▶ Deactivated
//!       └──────────────deactivate──────────────────────▲
//! ```
//!
//! `Deactivated` is terminal. Leaving `Active` raises [`IS_ACTIVE`] on the
//! binding's own hub exactly once; the manager listens for it and unregisters
//! the binding.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use propbind_core::mode::BindingMode;
use propbind_core::notify::{ChangeHandler, NotifyPropertyChanged, PropertyChangedEvents, SubscriptionId};
use propbind_core::value::TypeTag;

/// Process-unique binding identifier.
pub type BindingId = u64;

/// Property name raised on a binding's hub when it stops being active.
pub const IS_ACTIVE: &str = "is_active";

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate the next id. Ids are strictly increasing across the process,
/// shared by every manager.
pub(crate) fn next_binding_id() -> BindingId {
    NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed)
}

/// Where a binding is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Constructing,
    Active,
    Deactivated,
}

impl Lifecycle {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Constructing => 0,
            Self::Active => 1,
            Self::Deactivated => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Constructing,
            1 => Self::Active,
            _ => Self::Deactivated,
        }
    }
}

/// State common to all bindings, independent of endpoint types.
pub struct BindingState {
    id: BindingId,
    mode: BindingMode,
    lifecycle: AtomicU8,
    updating: AtomicBool,
    source_property: &'static str,
    target_property: &'static str,
    source_type: TypeTag,
    target_type: TypeTag,
    events: PropertyChangedEvents,
}

impl BindingState {
    pub(crate) fn new(
        id: BindingId,
        mode: BindingMode,
        (source_property, source_type): (&'static str, TypeTag),
        (target_property, target_type): (&'static str, TypeTag),
    ) -> Self {
        Self {
            id,
            mode,
            lifecycle: AtomicU8::new(Lifecycle::Constructing.to_u8()),
            updating: AtomicBool::new(false),
            source_property,
            target_property,
            source_type,
            target_type,
            events: PropertyChangedEvents::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    #[must_use]
    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lifecycle() == Lifecycle::Active
    }

    /// True while a read-convert-write sequence is running for this binding.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn source_property(&self) -> &'static str {
        self.source_property
    }

    #[must_use]
    pub fn target_property(&self) -> &'static str {
        self.target_property
    }

    #[must_use]
    pub fn source_type(&self) -> TypeTag {
        self.source_type
    }

    #[must_use]
    pub fn target_type(&self) -> TypeTag {
        self.target_type
    }

    /// `Constructing → Active`. Has no effect from any other state.
    pub(crate) fn activate(&self) -> bool {
        self.lifecycle
            .compare_exchange(
                Lifecycle::Constructing.to_u8(),
                Lifecycle::Active.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Enter `Deactivated`. Raises [`IS_ACTIVE`] if the binding was active.
    ///
    /// Returns whether this call performed the `Active → Deactivated` step.
    pub(crate) fn deactivate(&self) -> bool {
        let previous = Lifecycle::from_u8(
            self.lifecycle
                .swap(Lifecycle::Deactivated.to_u8(), Ordering::AcqRel),
        );
        if previous != Lifecycle::Active {
            return false;
        }
        tracing::debug!(
            binding_id = self.id,
            source = %self.source_type.short_name(),
            target = %self.target_type.short_name(),
            "binding deactivated"
        );
        self.events.notify(IS_ACTIVE);
        true
    }

    /// Raise the updating flag until the returned guard drops.
    pub(crate) fn begin_update(&self) -> Option<UpdatingFlag<'_>> {
        self.updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| UpdatingFlag {
                flag: &self.updating,
            })
    }

    /// Snapshot for diagnostics.
    #[must_use]
    pub fn info(&self) -> BindingInfo {
        BindingInfo {
            id: self.id,
            mode: self.mode,
            lifecycle: self.lifecycle(),
            source_property: self.source_property,
            target_property: self.target_property,
            source_type: self.source_type,
            target_type: self.target_type,
        }
    }
}

impl NotifyPropertyChanged for BindingState {
    fn subscribe(&self, property: &str, handler: ChangeHandler) -> SubscriptionId {
        self.events.subscribe(property, handler)
    }

    fn unsubscribe(&self, property: &str, id: SubscriptionId) -> bool {
        self.events.unsubscribe(property, id)
    }
}

impl fmt::Debug for BindingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingState")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("lifecycle", &self.lifecycle())
            .field("updating", &self.is_updating())
            .field(
                "source",
                &format_args!("{}.{}", self.source_type.short_name(), self.source_property),
            )
            .field(
                "target",
                &format_args!("{}.{}", self.target_type.short_name(), self.target_property),
            )
            .finish()
    }
}

/// Clears the updating flag on every exit path.
pub(crate) struct UpdatingFlag<'a> {
    flag: &'a AtomicBool,
}

impl Drop for UpdatingFlag<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Plain description of a registered binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    pub id: BindingId,
    pub mode: BindingMode,
    pub lifecycle: Lifecycle,
    pub source_property: &'static str,
    pub target_property: &'static str,
    pub source_type: TypeTag,
    pub target_type: TypeTag,
}

impl fmt::Display for BindingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {}.{} -[{}]-> {}.{}",
            self.id,
            self.source_type.short_name(),
            self.source_property,
            self.mode,
            self.target_type.short_name(),
            self.target_property,
        )
    }
}

/// A live binding as held by the registry.
pub trait Binding: Send + Sync {
    /// Shared identity and lifecycle state.
    fn state(&self) -> &BindingState;

    /// Release endpoint subscriptions and drop every reference the binding
    /// holds to its endpoints, converter, and accessors. Idempotent.
    fn dispose(&self);

    fn id(&self) -> BindingId {
        self.state().id()
    }

    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    fn info(&self) -> BindingInfo {
        self.state().info()
    }
}
