use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Open-ended characteristic bag. Ordered so every pass over it is deterministic.
pub type CharacteristicMap = BTreeMap<String, CharacteristicValue>;

/// A single property characteristic: continuous, boolean, or categorical.
///
/// Deserializes from a bare scalar: `1.7`, `true`, `"good"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Number(f64),
    Flag(bool),
    Category(String),
}

impl CharacteristicValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Category(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Short type label used in explanations ("number", "flag", "category").
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Flag(_) => "flag",
            Self::Category(_) => "category",
        }
    }

    pub fn same_type(&self, other: &CharacteristicValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            Self::Category(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for CharacteristicValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for CharacteristicValue {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

impl From<&str> for CharacteristicValue {
    fn from(s: &str) -> Self {
        Self::Category(s.to_string())
    }
}
