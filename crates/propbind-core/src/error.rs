#![forbid(unsafe_code)]

//! Error kinds for binding registration and conversion.
//!
//! Registration-time failures are returned synchronously from `register` and
//! leave no binding behind. Conversion failures never reach the caller that
//! mutated a property: the engine degrades them to a default value.
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | [`BindingError::Registration`] | type mismatch without converter, duplicate id |
//! | [`BindingError::InvalidArgument`] | empty property reference |
//! | [`BindingError::UnresolvedProperty`] | name is not a property of the type (or has another value type) |
//! | [`BindingError::NotSupported`] | property lacks the required get/set direction |
//! | [`BindingError::NotFound`] | `unregister` with an unknown id |

use std::fmt;

/// Which half of a property an accessor implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessDirection {
    /// Read capability (value from object).
    Get,
    /// Write capability (object, value).
    Set,
}

impl fmt::Display for AccessDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("get"),
            Self::Set => f.write_str("set"),
        }
    }
}

/// Reasons a binding could not be added to the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Property types differ and no converter was supplied.
    #[error(
        "unable to create binding because {target_type} and {source_type} are not the same type and no converter was specified"
    )]
    TypeMismatch {
        source_type: &'static str,
        target_type: &'static str,
    },
    /// The registry already held an entry under the allocated id.
    #[error("unable to register binding {0}: id already present")]
    DuplicateId(u64),
}

/// Errors surfaced synchronously by binding registration and removal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A required argument was missing or empty.
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: &'static str,
    },

    /// The referenced member is not a resolvable property of the object type.
    #[error("unable to create binding because {property} is not a publicly accessible property of {owner}")]
    UnresolvedProperty {
        owner: &'static str,
        property: String,
    },

    /// The property exists but has no accessor for the requested direction.
    #[error("unable to create binding because property {property} has no publicly available {direction} method")]
    NotSupported {
        property: String,
        direction: AccessDirection,
    },

    /// No binding is registered under this id.
    #[error("binding with key {0} not found")]
    NotFound(u64),
}

impl BindingError {
    /// True for errors raised by the registration type check.
    #[must_use]
    pub fn is_registration(&self) -> bool {
        matches!(self, Self::Registration(_))
    }
}

/// Failure reported by a converter for a single value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("conversion to {target} failed: {message}")]
pub struct ConversionError {
    /// Name of the type the converter was producing.
    pub target: &'static str,
    /// Human-readable cause.
    pub message: String,
}

impl ConversionError {
    /// Build an error for a conversion into `T`.
    pub fn new<T: ?Sized>(message: impl Into<String>) -> Self {
        Self {
            target: std::any::type_name::<T>(),
            message: message.into(),
        }
    }

    /// Wrap any displayable error (e.g. `ParseIntError`) as a conversion into `T`.
    pub fn from_error<T: ?Sized>(err: impl fmt::Display) -> Self {
        Self::new::<T>(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_message_names_both_types() {
        let err = BindingError::from(RegistrationError::TypeMismatch {
            source_type: "i32",
            target_type: "alloc::string::String",
        });
        let msg = err.to_string();
        assert!(msg.contains("i32"));
        assert!(msg.contains("String"));
        assert!(err.is_registration());
    }

    #[test]
    fn not_supported_names_direction() {
        let err = BindingError::NotSupported {
            property: "len".into(),
            direction: AccessDirection::Set,
        };
        assert!(err.to_string().contains("no publicly available set method"));
        assert!(!err.is_registration());
    }

    #[test]
    fn conversion_error_from_parse_failure() {
        let parse = "Toasty".parse::<i32>().unwrap_err();
        let err = ConversionError::from_error::<i32>(parse);
        assert_eq!(err.target, "i32");
        assert!(err.to_string().starts_with("conversion to i32 failed"));
    }

    #[test]
    fn not_found_is_keyed_by_id() {
        assert_eq!(
            BindingError::NotFound(7).to_string(),
            "binding with key 7 not found"
        );
    }
}
