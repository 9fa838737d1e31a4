//! Tagged values stored in a machine's context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A context value.
///
/// The engine is agnostic to what each key holds. Callers decide the kind
/// per key and read it back with the matching accessor; a mismatched
/// accessor returns `None`.
///
/// # Example
///
/// ```rust
/// use latch::core::ContextValue;
///
/// let counter = ContextValue::from(3);
/// assert_eq!(counter.as_int(), Some(3));
/// assert_eq!(counter.as_bool(), None);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContextValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl ContextValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Name of the payload kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ContextValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ContextValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_match_kind() {
        assert_eq!(ContextValue::from(true).as_bool(), Some(true));
        assert_eq!(ContextValue::from(7i64).as_int(), Some(7));
        assert_eq!(ContextValue::from(1.5).as_float(), Some(1.5));
        assert_eq!(ContextValue::from("ready").as_str(), Some("ready"));
        assert_eq!(
            ContextValue::from(json!({"a": 1})).as_json(),
            Some(&json!({"a": 1}))
        );
    }

    #[test]
    fn accessors_reject_other_kinds() {
        let value = ContextValue::from("3");
        assert_eq!(value.as_int(), None);
        assert_eq!(value.as_bool(), None);
        assert_eq!(value.kind(), "text");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(ContextValue::Int(4)).unwrap();
        assert_eq!(json, json!({"kind": "int", "value": 4}));

        let back: ContextValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, ContextValue::Int(4));
    }

    #[test]
    fn display_renders_payload() {
        assert_eq!(ContextValue::Bool(false).to_string(), "false");
        assert_eq!(ContextValue::Text("x".into()).to_string(), "\"x\"");
    }
}
