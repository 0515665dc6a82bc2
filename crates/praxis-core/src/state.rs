//! Agent state: a mapping from attribute name to [`Value`].
//!
//! States are treated as immutable by search code. Every transition builds a
//! new `State` through [`State::with`] or [`State::merge`]; the original is
//! left untouched.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// A snapshot of an agent's attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    attributes: BTreeMap<String, Value>,
}

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of an attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Get the numeric value of an attribute.
    pub fn num(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Check whether an attribute is present.
    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the state has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate attribute names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Set an attribute in place. Used when building states and by the
    /// agent shell, which owns its state exclusively.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Return a copy of this state with one attribute replaced.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> State {
        let mut next = self.clone();
        next.insert(key, value);
        next
    }

    /// Return a copy of this state overlaid with every attribute of `patch`.
    pub fn merge(&self, patch: &State) -> State {
        let mut next = self.clone();
        for (k, v) in &patch.attributes {
            next.attributes.insert(k.clone(), v.clone());
        }
        next
    }

    /// Hash the full state for visited-set bookkeeping.
    ///
    /// Numeric attributes are quantised to `resolution` first so that states
    /// differing only by floating-point noise collide. A non-positive
    /// resolution hashes exact bit patterns.
    pub fn fingerprint(&self, resolution: f64) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_into(&mut hasher, resolution);
        hasher.finish()
    }

    pub(crate) fn hash_into<H: Hasher>(&self, hasher: &mut H, resolution: f64) {
        for (k, v) in &self.attributes {
            k.hash(hasher);
            match v {
                Value::Num(x) if resolution > 0.0 => {
                    0u8.hash(hasher);
                    // Adding 0.0 folds -0.0 into 0.0.
                    ((x / resolution).round() + 0.0).to_bits().hash(hasher);
                }
                Value::Num(x) => {
                    0u8.hash(hasher);
                    x.to_bits().hash(hasher);
                }
                Value::Bool(b) => {
                    1u8.hash(hasher);
                    b.hash(hasher);
                }
                Value::Enum(s) => {
                    2u8.hash(hasher);
                    s.hash(hasher);
                }
            }
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for State {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_is_copy_on_write() {
        let state: State = [("cash", 0.0)].into_iter().collect();
        let next = state.with("cash", 100.0);

        assert_eq!(state.num("cash"), Some(0.0));
        assert_eq!(next.num("cash"), Some(100.0));
    }

    #[test]
    fn test_merge_overlays_patch() {
        let state: State = [("cash", Value::from(5.0)), ("employed", Value::from(false))]
            .into_iter()
            .collect();
        let patch: State = [("employed", true)].into_iter().collect();

        let merged = state.merge(&patch);
        assert_eq!(merged.get("employed"), Some(&Value::Bool(true)));
        assert_eq!(merged.num("cash"), Some(5.0));
        assert_eq!(state.get("employed"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_fingerprint_quantises_numbers() {
        let a: State = [("cash", 100.0)].into_iter().collect();
        let b: State = [("cash", 100.0 + 1e-9)].into_iter().collect();
        let c: State = [("cash", 101.0)].into_iter().collect();

        assert_eq!(a.fingerprint(1e-6), b.fingerprint(1e-6));
        assert_ne!(a.fingerprint(0.0), b.fingerprint(0.0));
        assert_ne!(a.fingerprint(1e-6), c.fingerprint(1e-6));
    }

    #[test]
    fn test_fingerprint_distinguishes_large_values() {
        let a: State = [("cash", 1e14)].into_iter().collect();
        let b: State = [("cash", 2e14)].into_iter().collect();
        let c: State = [("cash", -1e14)].into_iter().collect();

        assert_ne!(a.fingerprint(1e-6), b.fingerprint(1e-6));
        assert_ne!(a.fingerprint(1e-6), c.fingerprint(1e-6));
    }

    #[test]
    fn test_fingerprint_ignores_sign_of_zero() {
        let a: State = [("cash", 0.0)].into_iter().collect();
        let b: State = [("cash", -1e-9)].into_iter().collect();

        assert_eq!(a.fingerprint(1e-6), b.fingerprint(1e-6));
    }

    #[test]
    fn test_serde_roundtrip_shape() {
        let state: State = serde_json::from_str(r#"{"cash": 10.0, "employed": true}"#).unwrap();
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("employed"), Some(&Value::Bool(true)));
    }
}
