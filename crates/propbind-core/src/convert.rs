#![forbid(unsafe_code)]

//! Bidirectional value conversion between endpoint property types.
//!
//! A [`BindingConverter<S, T>`] maps a source property value to the target
//! property type and back. Either direction may fail with a
//! [`ConversionError`]; the engine catches the failure and writes the
//! destination type's default value instead.
//!
//! When no converter is supplied, the engine uses [`IdentityConverter`], which
//! only succeeds when `S` and `T` are the same type. Registration checks that
//! before any conversion runs.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::error::ConversionError;

/// Converts values between a source property type `S` and a target property
/// type `T`.
pub trait BindingConverter<S, T>: Send + Sync {
    /// Convert a source value for assignment to the target.
    fn source_to_target(&self, value: S) -> Result<T, ConversionError>;

    /// Convert a target value for assignment back to the source.
    fn target_to_source(&self, value: T) -> Result<S, ConversionError>;
}

/// Move a value between two types that must be identical at runtime.
fn pass_through<A: 'static, B: 'static>(value: A) -> Result<B, ConversionError> {
    let boxed: Box<dyn Any> = Box::new(value);
    boxed.downcast::<B>().map(|b| *b).map_err(|_| {
        ConversionError::new::<B>(format!(
            "{} is not the same type",
            std::any::type_name::<A>()
        ))
    })
}

/// Same-type assignment used when a binding has no converter.
pub struct IdentityConverter<S, T> {
    _types: PhantomData<fn(S) -> T>,
}

impl<S, T> IdentityConverter<S, T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _types: PhantomData,
        }
    }
}

impl<S, T> Default for IdentityConverter<S, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, T> fmt::Debug for IdentityConverter<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityConverter")
    }
}

impl<S: 'static, T: 'static> BindingConverter<S, T> for IdentityConverter<S, T> {
    fn source_to_target(&self, value: S) -> Result<T, ConversionError> {
        pass_through(value)
    }

    fn target_to_source(&self, value: T) -> Result<S, ConversionError> {
        pass_through(value)
    }
}

/// A converter assembled from two closures.
pub struct FnConverter<F, B> {
    forward: F,
    backward: B,
}

impl<F, B> fmt::Debug for FnConverter<F, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnConverter")
    }
}

impl<S, T, F, B> BindingConverter<S, T> for FnConverter<F, B>
where
    F: Fn(S) -> Result<T, ConversionError> + Send + Sync,
    B: Fn(T) -> Result<S, ConversionError> + Send + Sync,
{
    fn source_to_target(&self, value: S) -> Result<T, ConversionError> {
        (self.forward)(value)
    }

    fn target_to_source(&self, value: T) -> Result<S, ConversionError> {
        (self.backward)(value)
    }
}

/// Build a converter from a forward (source → target) and a backward
/// (target → source) function.
///
/// ```
/// use propbind_core::convert::{BindingConverter, converter_fn};
/// use propbind_core::error::ConversionError;
///
/// let celsius = converter_fn(
///     |f: f64| Ok::<_, ConversionError>((f - 32.0) * 5.0 / 9.0),
///     |c: f64| Ok(c * 9.0 / 5.0 + 32.0),
/// );
/// assert_eq!(celsius.source_to_target(212.0).unwrap(), 100.0);
/// assert_eq!(celsius.target_to_source(0.0).unwrap(), 32.0);
/// ```
pub fn converter_fn<S, T, F, B>(forward: F, backward: B) -> FnConverter<F, B>
where
    F: Fn(S) -> Result<T, ConversionError> + Send + Sync,
    B: Fn(T) -> Result<S, ConversionError> + Send + Sync,
{
    FnConverter { forward, backward }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_same_type() {
        let conv = IdentityConverter::<i32, i32>::new();
        assert_eq!(conv.source_to_target(5), Ok(5));
        assert_eq!(conv.target_to_source(-3), Ok(-3));
    }

    #[test]
    fn identity_rejects_different_types() {
        let conv = IdentityConverter::<i32, String>::new();
        let err = conv.source_to_target(5).unwrap_err();
        assert!(err.target.contains("String"));
    }

    #[test]
    fn fn_converter_reports_failures() {
        let conv = converter_fn(
            |s: String| s.parse::<i32>().map_err(ConversionError::from_error::<i32>),
            |n: i32| Ok(n.to_string()),
        );
        assert_eq!(conv.source_to_target("42".into()), Ok(42));
        assert!(conv.source_to_target("Toasty".into()).is_err());
        assert_eq!(conv.target_to_source(7), Ok("7".to_string()));
    }
}
