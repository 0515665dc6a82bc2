//! Prerequisites: boolean satisfaction plus a graded distance to satisfaction.
//!
//! A [`Prereq`] constrains a single attribute value. Leaves compare the value
//! against a target; `&` and `|` compose them into AND/OR trees. A
//! [`Prereqs`] map attaches one prerequisite tree to each attribute and
//! combines per-attribute distances into a Euclidean distance.

use std::collections::BTreeMap;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

use crate::state::State;
use crate::types::Value;

/// Distance reported by an unsatisfied leaf whose normalised gap is zero,
/// e.g. `v < 10` evaluated at `v = 10`.
pub const BOUNDARY_DISTANCE: f64 = 1e-9;

/// Distance reported by an unsatisfied non-numeric leaf, a type mismatch, or
/// a prerequisite on an attribute the state does not carry.
pub const CATEGORICAL_DISTANCE: f64 = 1.0;

/// Binary comparison between an attribute value and a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Comparator {
    /// Evaluate `value <op> target`.
    ///
    /// Ordering comparators only hold between numbers. Booleans and enums
    /// support `Eq` and `Ne`.
    pub fn holds(&self, value: &Value, target: &Value) -> bool {
        match (value.as_f64(), target.as_f64()) {
            (Some(v), Some(t)) => match self {
                Comparator::Lt => v < t,
                Comparator::Le => v <= t,
                Comparator::Eq => v == t,
                Comparator::Ne => v != t,
                Comparator::Ge => v >= t,
                Comparator::Gt => v > t,
            },
            _ => match self {
                Comparator::Eq => value == target,
                Comparator::Ne => value != target,
                _ => false,
            },
        }
    }
}

/// A prerequisite over one attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prereq {
    /// Leaf comparison against a target.
    Compare { op: Comparator, target: Value },
    /// Both children must hold; distance is the sum.
    And(Box<Prereq>, Box<Prereq>),
    /// Either child must hold; distance is the minimum.
    Or(Box<Prereq>, Box<Prereq>),
}

impl Prereq {
    /// Leaf prerequisite.
    pub fn compare(op: Comparator, target: impl Into<Value>) -> Self {
        Prereq::Compare {
            op,
            target: target.into(),
        }
    }

    pub fn lt(target: impl Into<Value>) -> Self {
        Self::compare(Comparator::Lt, target)
    }

    pub fn le(target: impl Into<Value>) -> Self {
        Self::compare(Comparator::Le, target)
    }

    pub fn eq(target: impl Into<Value>) -> Self {
        Self::compare(Comparator::Eq, target)
    }

    pub fn ne(target: impl Into<Value>) -> Self {
        Self::compare(Comparator::Ne, target)
    }

    pub fn ge(target: impl Into<Value>) -> Self {
        Self::compare(Comparator::Ge, target)
    }

    pub fn gt(target: impl Into<Value>) -> Self {
        Self::compare(Comparator::Gt, target)
    }

    /// Check whether `value` satisfies this prerequisite.
    pub fn satisfied(&self, value: &Value) -> bool {
        match self {
            Prereq::Compare { op, target } => op.holds(value, target),
            Prereq::And(a, b) => a.satisfied(value) && b.satisfied(value),
            Prereq::Or(a, b) => a.satisfied(value) || b.satisfied(value),
        }
    }

    /// Squared normalised distance from `value` to satisfaction.
    ///
    /// Zero exactly when satisfied. Leaves use `((target - v) / target)^2`,
    /// falling back to the absolute squared gap when the target is zero.
    pub fn distance(&self, value: &Value) -> f64 {
        match self {
            Prereq::Compare { op, target } => {
                if op.holds(value, target) {
                    return 0.0;
                }
                match (value.as_f64(), target.as_f64()) {
                    (Some(v), Some(t)) => {
                        let gap = if t == 0.0 {
                            (t - v).powi(2)
                        } else {
                            ((t - v) / t).powi(2)
                        };
                        gap.max(BOUNDARY_DISTANCE)
                    }
                    _ => CATEGORICAL_DISTANCE,
                }
            }
            Prereq::And(a, b) => a.distance(value) + b.distance(value),
            Prereq::Or(a, b) => a.distance(value).min(b.distance(value)),
        }
    }
}

impl BitAnd for Prereq {
    type Output = Prereq;

    fn bitand(self, rhs: Prereq) -> Prereq {
        Prereq::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Prereq {
    type Output = Prereq;

    fn bitor(self, rhs: Prereq) -> Prereq {
        Prereq::Or(Box::new(self), Box::new(rhs))
    }
}

/// Prerequisites keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prereqs {
    by_attribute: BTreeMap<String, Prereq>,
}

impl Prereqs {
    /// No prerequisites; always satisfied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prerequisite on an attribute, AND-ing with any existing one.
    pub fn with(mut self, attribute: impl Into<String>, prereq: Prereq) -> Self {
        let attribute = attribute.into();
        let combined = match self.by_attribute.remove(&attribute) {
            Some(existing) => existing & prereq,
            None => prereq,
        };
        self.by_attribute.insert(attribute, combined);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.by_attribute.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prereq)> {
        self.by_attribute.iter().map(|(k, p)| (k.as_str(), p))
    }

    /// Check every attribute's prerequisite against `state`.
    pub fn satisfied(&self, state: &State) -> bool {
        self.by_attribute
            .iter()
            .all(|(k, p)| state.get(k).is_some_and(|v| p.satisfied(v)))
    }

    /// Attributes whose prerequisite does not hold in `state`.
    pub fn unsatisfied<'a>(&'a self, state: &State) -> Vec<&'a str> {
        self.by_attribute
            .iter()
            .filter(|(k, p)| !state.get(k).is_some_and(|v| p.satisfied(v)))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Euclidean distance of `state` to these prerequisites.
    pub fn distance(&self, state: &State) -> f64 {
        self.by_attribute
            .iter()
            .map(|(k, p)| match state.get(k) {
                Some(v) => p.distance(v),
                None => CATEGORICAL_DISTANCE,
            })
            .sum::<f64>()
            .sqrt()
    }
}

impl<K: Into<String>> FromIterator<(K, Prereq)> for Prereqs {
    fn from_iter<I: IntoIterator<Item = (K, Prereq)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Prereqs::new(), |acc, (k, p)| acc.with(k, p))
    }
}
