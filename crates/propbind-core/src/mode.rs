#![forbid(unsafe_code)]

//! Direction of propagation for a binding.

use std::fmt;

/// Which way values flow between the source and target endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BindingMode {
    /// Source → target only.
    OneWay,
    /// Target → source only.
    OneWayToSource,
    /// Both directions, guarded against ping-pong.
    #[default]
    TwoWay,
}

impl BindingMode {
    /// Whether source changes are pushed to the target.
    #[must_use]
    pub const fn updates_target(self) -> bool {
        matches!(self, Self::OneWay | Self::TwoWay)
    }

    /// Whether target changes are pushed back to the source.
    #[must_use]
    pub const fn updates_source(self) -> bool {
        matches!(self, Self::OneWayToSource | Self::TwoWay)
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneWay => "one-way",
            Self::OneWayToSource => "one-way-to-source",
            Self::TwoWay => "two-way",
        })
    }
}
