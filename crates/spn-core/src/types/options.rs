//! Build kinds and per-dependency option values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a dependency is built and consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    Shared,
    #[default]
    Static,
    /// Sources are vendored into the consumer; nothing is linked
    Source,
    /// Header-only or otherwise nothing to build
    None,
}

/// A single option value from a manifest or package record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Options keyed by name; iteration order is the name order.
pub type OptionSet = BTreeMap<String, OptionValue>;

impl BuildKind {
    /// Whether consumers link against a library produced by this kind
    pub fn links(&self) -> bool {
        matches!(self, BuildKind::Shared | BuildKind::Static)
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildKind::Shared => "shared",
            BuildKind::Static => "static",
            BuildKind::Source => "source",
            BuildKind::None => "none",
        };
        f.write_str(name)
    }
}

impl OptionValue {
    /// Type tag used when hashing, so `"1"` and `1` never collide
    pub fn tag(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "int",
            OptionValue::Str(_) => "str",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{}", value),
            OptionValue::Int(value) => write!(f, "{}", value),
            OptionValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_kind_links() {
        assert!(BuildKind::Shared.links());
        assert!(BuildKind::Static.links());
        assert!(!BuildKind::Source.links());
        assert!(!BuildKind::None.links());
        assert_eq!(BuildKind::default(), BuildKind::Static);
    }

    #[test]
    fn test_option_display_and_tag() {
        assert_eq!(OptionValue::from(true).to_string(), "true");
        assert_eq!(OptionValue::from(8).to_string(), "8");
        assert_eq!(OptionValue::from("fast").to_string(), "fast");
        assert_ne!(OptionValue::from(1).tag(), OptionValue::from("1").tag());
    }
}
