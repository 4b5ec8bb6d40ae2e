#![forbid(unsafe_code)]

//! Runtime policy for a [`BindingManager`](crate::manager::BindingManager).
//!
//! Defaults keep absent reads and failed conversions distinct. With the
//! `policy-config` feature the policy can also be loaded from TOML or JSON:
//!
//! ```toml
//! default_mode = "one_way"
//! conversion_failure = "fallback"
//! ```

use propbind_core::mode::BindingMode;

/// What an update writes when the converter cannot produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(rename_all = "snake_case"))]
pub enum ConversionFailurePolicy {
    /// Write the destination type's default value. The fallback value is
    /// reserved for reads that produce no data.
    #[default]
    TypeDefault,
    /// Write the fallback value (converted into the destination type for
    /// source → target updates). Falls back to the type default when that
    /// conversion fails as well.
    Fallback,
}

/// Manager-wide binding policy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct BindingConfig {
    /// Mode used when a registration does not specify one.
    pub default_mode: BindingMode,
    /// Treatment of converter failures during updates.
    pub conversion_failure: ConversionFailurePolicy,
}

impl BindingConfig {
    #[must_use]
    pub fn with_default_mode(mut self, mode: BindingMode) -> Self {
        self.default_mode = mode;
        self
    }

    #[must_use]
    pub fn with_conversion_failure(mut self, policy: ConversionFailurePolicy) -> Self {
        self.conversion_failure = policy;
        self
    }
}

/// Errors from loading a [`BindingConfig`].
#[cfg(feature = "policy-config")]
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Json(serde_json::Error),
}

#[cfg(feature = "policy-config")]
impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read binding config: {e}"),
            Self::Toml(e) => write!(f, "invalid TOML binding config: {e}"),
            Self::Json(e) => write!(f, "invalid JSON binding config: {e}"),
        }
    }
}

#[cfg(feature = "policy-config")]
impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
        }
    }
}

#[cfg(feature = "policy-config")]
impl BindingConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Toml)
    }

    /// Parse a JSON document. Missing keys keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Json)
    }

    /// Load from a file: `.json` is parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&text)?
        } else {
            Self::from_toml_str(&text)?
        };
        tracing::debug!(path = %path.display(), ?config, "loaded binding config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_preserve_reference_behavior() {
        let config = BindingConfig::default();
        assert_eq!(config.default_mode, BindingMode::TwoWay);
        assert_eq!(config.conversion_failure, ConversionFailurePolicy::TypeDefault);
    }

    #[test]
    fn builder_overrides() {
        let config = BindingConfig::default()
            .with_default_mode(BindingMode::OneWay)
            .with_conversion_failure(ConversionFailurePolicy::Fallback);
        assert_eq!(config.default_mode, BindingMode::OneWay);
        assert_eq!(config.conversion_failure, ConversionFailurePolicy::Fallback);
    }

    #[cfg(feature = "policy-config")]
    mod loading {
        use super::*;
        use std::io::Write;

        #[test]
        fn toml_partial_document_keeps_defaults() {
            let config = BindingConfig::from_toml_str(r#"default_mode = "one_way_to_source""#).unwrap();
            assert_eq!(config.default_mode, BindingMode::OneWayToSource);
            assert_eq!(config.conversion_failure, ConversionFailurePolicy::TypeDefault);
        }

        #[test]
        fn json_document() {
            let config =
                BindingConfig::from_json_str(r#"{"conversion_failure":"fallback"}"#).unwrap();
            assert_eq!(config.conversion_failure, ConversionFailurePolicy::Fallback);
            assert_eq!(config.default_mode, BindingMode::TwoWay);
        }

        #[test]
        fn unknown_mode_is_rejected() {
            let err = BindingConfig::from_toml_str(r#"default_mode = "sideways""#).unwrap_err();
            assert!(matches!(err, ConfigError::Toml(_)));
        }

        #[test]
        fn load_picks_format_by_extension() {
            let dir = tempfile::tempdir().unwrap();
            let json = dir.path().join("bindings.json");
            std::fs::File::create(&json)
                .unwrap()
                .write_all(br#"{"default_mode":"one_way"}"#)
                .unwrap();
            assert_eq!(
                BindingConfig::load(&json).unwrap().default_mode,
                BindingMode::OneWay
            );

            let toml_path = dir.path().join("bindings.toml");
            std::fs::write(&toml_path, "conversion_failure = \"fallback\"\n").unwrap();
            assert_eq!(
                BindingConfig::load(&toml_path).unwrap().conversion_failure,
                ConversionFailurePolicy::Fallback
            );

            assert!(matches!(
                BindingConfig::load(dir.path().join("missing.toml")),
                Err(ConfigError::Io(_))
            ));
        }
    }
}
