//! Multi-attribute utility model.
//!
//! Each tracked attribute has its own utility function. States are scored by
//! the change in utility a transition produces; goals add a term that grows
//! as the state approaches the goal's prerequisites.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use praxis_core::{Goal, GoalSet, State, Value};

/// Keeps denominators non-zero in goal utility.
pub const EPSILON: f64 = 1e-10;

/// Utility of a single attribute value.
pub type UtilityFn = Arc<dyn Fn(&Value) -> f64 + Send + Sync>;

/// Per-attribute utility functions. Attributes without one contribute nothing.
#[derive(Clone, Default)]
pub struct UtilityTable {
    funcs: BTreeMap<String, UtilityFn>,
}

impl fmt::Debug for UtilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.funcs.keys()).finish()
    }
}

impl UtilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a utility function over raw values.
    pub fn with<F>(mut self, attribute: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> f64 + Send + Sync + 'static,
    {
        self.funcs.insert(attribute.into(), Arc::new(f));
        self
    }

    /// Register a utility function over the numeric view of a value
    /// (booleans count as 1.0/0.0).
    pub fn with_numeric<F>(self, attribute: impl Into<String>, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        self.with(attribute, move |v: &Value| f(v.to_f64_lossy()))
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.funcs.contains_key(attribute)
    }

    /// Utility of one attribute value; zero for untracked attributes.
    pub fn attribute_utility(&self, attribute: &str, value: &Value) -> f64 {
        self.funcs.get(attribute).map_or(0.0, |u| u(value))
    }

    /// Change in utility going from `from` to `to`, summed over the tracked
    /// attributes present in both.
    pub fn transition_utility(&self, from: &State, to: &State) -> f64 {
        to.iter()
            .filter_map(|(k, v)| {
                let u = self.funcs.get(k)?;
                let before = from.get(k)?;
                Some(u(v) - u(before))
            })
            .sum()
    }

    /// Probability-weighted transition utility over outcome states.
    pub fn expected_utility(&self, state: &State, outcomes: &[(State, f64)]) -> f64 {
        outcomes
            .iter()
            .map(|(next, p)| p * self.transition_utility(state, next))
            .sum()
    }

    /// Utility of `state` with respect to a goal.
    ///
    /// Grows without bound as the state approaches the goal's prerequisites
    /// and scales with the expected gain of achieving it. Timed goals also
    /// weigh the utility of their expected failure state by `1 / time`.
    pub fn goal_utility(&self, state: &State, goal: &Goal) -> f64 {
        let dist = goal.prereqs().distance(state);
        let expected_gain = self.expected_utility(state, &goal.outcomes().states(state));

        let (time_discount, expected_loss) = match goal.time() {
            Some(time) => {
                let fail_state = goal.failures().expected_state(state);
                (
                    1.0 / (f64::from(time) + EPSILON),
                    self.transition_utility(state, &fail_state),
                )
            }
            None => (0.0, 0.0),
        };

        (1.0 / (dist + EPSILON)) * (expected_gain - expected_loss * time_discount)
    }

    /// Sum of goal utilities over a goal set.
    pub fn goals_utility(&self, state: &State, goals: &GoalSet) -> f64 {
        goals.iter().map(|g| self.goal_utility(state, g)).sum()
    }

    /// Ranking key for a candidate transition: its utility change plus the
    /// goal utility of the resulting state.
    pub fn successor_score(&self, from: &State, to: &State, goals: &GoalSet) -> f64 {
        self.transition_utility(from, to) + self.goals_utility(to, goals)
    }
}
