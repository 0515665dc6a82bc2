//! Attenuation: clipping and coercing attribute values to legal ranges and
//! types after every transition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::State;
use crate::types::Value;

/// Target type an attribute is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Float,
    Integer,
    Bool,
}

/// Range and type rule for one attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default, rename = "type")]
    pub kind: Option<AttributeType>,
}

impl Constraint {
    /// Clip to `[min, max]`; either bound may be open.
    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            kind: None,
        }
    }

    /// Coerce to a type.
    pub fn typed(kind: AttributeType) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Add a type coercion to a range rule.
    pub fn with_type(mut self, kind: AttributeType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Coerce then clip a value. Enum values pass through untouched.
    pub fn attenuate(&self, value: Value) -> Value {
        let value = match (self.kind, value) {
            (Some(AttributeType::Bool), Value::Num(x)) => return Value::Bool(x != 0.0),
            (Some(AttributeType::Bool), other) => return other,
            (Some(_), Value::Bool(b)) => Value::Num(if b { 1.0 } else { 0.0 }),
            (_, other) => other,
        };

        match value {
            Value::Num(mut x) => {
                if let Some(min) = self.min {
                    x = x.max(min);
                }
                if let Some(max) = self.max {
                    x = x.min(max);
                }
                if self.kind == Some(AttributeType::Integer) {
                    x = x.trunc();
                }
                Value::Num(x)
            }
            other => other,
        }
    }
}

/// Attenuation rules keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constraints {
    rules: BTreeMap<String, Constraint>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: impl Into<String>, constraint: Constraint) -> Self {
        self.rules.insert(attribute.into(), constraint);
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&Constraint> {
        self.rules.get(attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Attenuate one value for the named attribute.
    pub fn attenuate_value(&self, attribute: &str, value: Value) -> Value {
        match self.rules.get(attribute) {
            Some(rule) => rule.attenuate(value),
            None => value,
        }
    }

    /// Attenuate every constrained attribute of a state, returning a new state.
    pub fn attenuate_state(&self, state: &State) -> State {
        if self.rules.is_empty() {
            return state.clone();
        }
        state
            .iter()
            .map(|(k, v)| (k, self.attenuate_value(k, v.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clipping() {
        let rule = Constraint::range(Some(0.0), Some(1.0));
        assert_eq!(rule.attenuate(Value::from(-0.5)), Value::Num(0.0));
        assert_eq!(rule.attenuate(Value::from(1.5)), Value::Num(1.0));
        assert_eq!(rule.attenuate(Value::from(0.25)), Value::Num(0.25));
    }

    #[test]
    fn test_open_bounds() {
        let rule = Constraint::range(Some(0.0), None);
        assert_eq!(rule.attenuate(Value::from(1e9)), Value::Num(1e9));
        assert_eq!(rule.attenuate(Value::from(-3)), Value::Num(0.0));
    }

    #[test]
    fn test_type_coercion() {
        let int = Constraint::range(None, Some(10.0)).with_type(AttributeType::Integer);
        assert_eq!(int.attenuate(Value::from(3.7)), Value::Num(3.0));
        assert_eq!(int.attenuate(Value::from(12.5)), Value::Num(10.0));
        assert_eq!(int.attenuate(Value::from(true)), Value::Num(1.0));

        let flag = Constraint::typed(AttributeType::Bool);
        assert_eq!(flag.attenuate(Value::from(1)), Value::Bool(true));
        assert_eq!(flag.attenuate(Value::from(0)), Value::Bool(false));
        assert_eq!(flag.attenuate(Value::from("x")), Value::from("x"));
    }

    #[test]
    fn test_attenuate_state() {
        let constraints = Constraints::new()
            .with("stress", Constraint::range(Some(0.0), None))
            .with("employed", Constraint::typed(AttributeType::Bool));
        let state: State = [
            ("stress", Value::from(-2.0)),
            ("employed", Value::from(1.0)),
            ("cash", Value::from(-50.0)),
        ]
        .into_iter()
        .collect();

        let attenuated = constraints.attenuate_state(&state);
        assert_eq!(attenuated.num("stress"), Some(0.0));
        assert_eq!(attenuated.get("employed"), Some(&Value::Bool(true)));
        assert_eq!(attenuated.num("cash"), Some(-50.0));
        assert_eq!(state.num("stress"), Some(-2.0));
    }

    #[test]
    fn test_constraints_from_json() {
        let constraints: Constraints = serde_json::from_str(
            r#"{"stress": {"min": 0.0}, "hour": {"min": 0, "max": 24, "type": "integer"}}"#,
        )
        .unwrap();

        assert_eq!(
            constraints.attenuate_value("hour", Value::from(30.2)),
            Value::Num(24.0)
        );
        assert_eq!(constraints.get("stress").and_then(|c| c.max), None);
    }
}
