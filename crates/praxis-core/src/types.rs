//! Common types used across the Praxis planner.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The value of a single state attribute.
///
/// Numeric attributes are averaged when computing expected states; boolean
/// and enum attributes take the most probable value instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean flag (e.g. "employed").
    Bool(bool),
    /// A real-valued quantity (e.g. "cash").
    Num(f64),
    /// A categorical value (e.g. "neighborhood").
    Enum(String),
}

/// Kind of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Num,
    Enum,
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Num(_) => ValueKind::Num,
            Value::Enum(_) => ValueKind::Enum,
        }
    }

    /// Returns true if this value can be summed and scaled.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Num(_))
    }

    /// Numeric payload, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(x) => Some(*x),
            _ => None,
        }
    }

    /// Boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Enum payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Lossy numeric view used by utility functions: booleans map to 1.0/0.0.
    pub fn to_f64_lossy(&self) -> f64 {
        match self {
            Value::Num(x) => *x,
            Value::Bool(true) => 1.0,
            Value::Bool(false) => 0.0,
            Value::Enum(_) => 0.0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Num(x) => write!(f, "{}", x),
            Value::Enum(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Num(x)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::Num(f64::from(x))
    }
}

impl From<u32> for Value {
    fn from(x: u32) -> Self {
        Value::Num(f64::from(x))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Enum(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Enum(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind() {
        assert_eq!(Value::from(1.5).kind(), ValueKind::Num);
        assert_eq!(Value::from(true).kind(), ValueKind::Bool);
        assert_eq!(Value::from("downtown").kind(), ValueKind::Enum);
        assert!(Value::from(3).is_numeric());
        assert!(!Value::from(false).is_numeric());
    }

    #[test]
    fn test_untagged_serde() {
        let values: Vec<Value> = serde_json::from_str(r#"[true, 2.5, "renter"]"#).unwrap();
        assert_eq!(
            values,
            vec![Value::Bool(true), Value::Num(2.5), Value::Enum("renter".into())]
        );
    }

    #[test]
    fn test_lossy_numeric_view() {
        assert_eq!(Value::Bool(true).to_f64_lossy(), 1.0);
        assert_eq!(Value::Num(-4.0).to_f64_lossy(), -4.0);
    }
}
