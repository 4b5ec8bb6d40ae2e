#![forbid(unsafe_code)]

//! Bound property values and type identity.
//!
//! A property type participates in a binding when it implements
//! [`PropertyValue`]. `Default::default()` is the type's zero value: the engine
//! writes it when there is neither data nor a fallback, and when a conversion
//! fails.
//!
//! "Absent" is distinct from the zero value. `None` is absent; `0` and `""`
//! are ordinary values. Only absent reads trigger fallback substitution.

use std::any::TypeId;
use std::fmt;

/// A value that can be read from one endpoint and written to another.
pub trait PropertyValue: Clone + Default + Send + Sync + 'static {
    /// Whether this value carries no data.
    fn is_absent(&self) -> bool {
        false
    }
}

macro_rules! plain_property_values {
    ($($ty:ty),* $(,)?) => {
        $(impl PropertyValue for $ty {})*
    };
}

plain_property_values!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String,
);

impl<T: Clone + Send + Sync + 'static> PropertyValue for Option<T> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

impl<T: Clone + Send + Sync + 'static> PropertyValue for Vec<T> {}

/// Runtime identity of a type, with its name kept for diagnostics.
#[derive(Clone, Copy, Eq)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name (`Counter` for `app::model::Counter`).
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::hash::Hash for TypeTag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
