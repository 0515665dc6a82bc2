//! Goals: desired states with success outcomes, optional deadlines and
//! failure outcomes.
//!
//! A goal is immutable. Its countdown advances through [`Goal::advance`],
//! which returns a new goal (or an expiry record) instead of mutating in
//! place, so goal values can be shared across concurrently planning agents.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::RngCore;

use crate::action::Action;
use crate::error::{PraxisError, Result};
use crate::outcome::{Outcomes, Update};
use crate::prereq::{Prereq, Prereqs};
use crate::state::State;

/// A goal an agent pursues.
#[derive(Debug, Clone)]
pub struct Goal {
    /// Name, prerequisites and success outcomes.
    action: Action,
    failures: Outcomes,
    time: Option<u32>,
    deadline: Option<u32>,
    repeats: bool,
}

/// Result of advancing a goal's countdown.
#[derive(Debug, Clone)]
pub enum GoalProgress {
    /// Still pursued, with the updated countdown.
    Active(Goal),
    /// The countdown ran out. `state` is the input state with a failure
    /// outcome resolved on it; `renewed` is the reset goal if it repeats.
    Expired {
        state: State,
        renewed: Option<Goal>,
    },
}

impl Goal {
    /// Create a new GoalBuilder.
    pub fn builder(name: impl Into<String>) -> GoalBuilder {
        GoalBuilder::new(name)
    }

    /// Promote a desired action into an untimed goal with the same
    /// prerequisites and outcomes.
    pub fn from_action(action: &Action) -> Self {
        Self {
            action: action.clone(),
            failures: Outcomes::none(),
            time: None,
            deadline: None,
            repeats: false,
        }
    }

    /// Reframe this goal as a terminal action whose prerequisites are the
    /// search target.
    pub fn as_action(&self) -> Action {
        self.action.clone()
    }

    pub fn name(&self) -> &str {
        self.action.name()
    }

    pub fn prereqs(&self) -> &Prereqs {
        self.action.prereqs()
    }

    /// Outcomes of achieving the goal.
    pub fn outcomes(&self) -> &Outcomes {
        self.action.outcomes()
    }

    /// Outcomes of letting the goal expire.
    pub fn failures(&self) -> &Outcomes {
        &self.failures
    }

    /// Ticks left before the goal expires; `None` if untimed.
    pub fn time(&self) -> Option<u32> {
        self.time
    }

    pub fn repeats(&self) -> bool {
        self.repeats
    }

    pub fn cost(&self) -> f64 {
        self.action.cost()
    }

    pub fn duration(&self) -> u32 {
        self.action.duration()
    }

    /// Check whether `state` meets the goal's prerequisites.
    pub fn satisfied(&self, state: &State) -> bool {
        self.action.satisfied(state)
    }

    /// Expected state after achieving the goal.
    pub fn expected_state(&self, state: &State) -> State {
        self.action.expected_state(state)
    }

    /// Advance the countdown by `dt` ticks.
    pub fn advance(&self, state: &State, dt: u32, rng: &mut dyn RngCore) -> GoalProgress {
        let Some(time) = self.time else {
            return GoalProgress::Active(self.clone());
        };

        let remaining = time.saturating_sub(dt);
        if remaining > 0 {
            return GoalProgress::Active(Self {
                time: Some(remaining),
                ..self.clone()
            });
        }

        let renewed = self.repeats.then(|| Self {
            time: self.deadline,
            ..self.clone()
        });
        GoalProgress::Expired {
            state: self.failures.resolve(state, rng),
            renewed,
        }
    }
}

/// Builder for creating Goals with a fluent API.
#[derive(Debug)]
pub struct GoalBuilder {
    action: crate::action::ActionBuilder,
    failures: Option<Outcomes>,
    failure_updates: Vec<Update>,
    failure_probs: Vec<f64>,
    time: Option<u32>,
    repeats: bool,
}

impl GoalBuilder {
    /// Create a new GoalBuilder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            action: Action::builder(name),
            failures: None,
            failure_updates: Vec::new(),
            failure_probs: Vec::new(),
            time: None,
            repeats: false,
        }
    }

    /// Add a prerequisite on an attribute.
    pub fn prereq(mut self, attribute: impl Into<String>, prereq: Prereq) -> Self {
        self.action = self.action.prereq(attribute, prereq);
        self
    }

    /// Add a success outcome with a fixed probability.
    pub fn outcome(mut self, update: Update, probability: f64) -> Self {
        self.action = self.action.outcome(update, probability);
        self
    }

    /// Use a prebuilt success outcome set.
    pub fn outcomes(mut self, outcomes: Outcomes) -> Self {
        self.action = self.action.outcomes(outcomes);
        self
    }

    /// Add a failure outcome with a fixed probability.
    pub fn failure(mut self, update: Update, probability: f64) -> Self {
        self.failure_updates.push(update);
        self.failure_probs.push(probability);
        self
    }

    /// Use a prebuilt failure outcome set.
    pub fn failures(mut self, failures: Outcomes) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Set the countdown in ticks.
    pub fn time(mut self, time: u32) -> Self {
        self.time = Some(time);
        self
    }

    /// Reset and re-insert the goal when it expires.
    pub fn repeats(mut self, repeats: bool) -> Self {
        self.repeats = repeats;
        self
    }

    /// Set the edge-cost multiplier used when the goal is fulfilled.
    pub fn cost(mut self, cost: f64) -> Self {
        self.action = self.action.cost(cost);
        self
    }

    /// Build the Goal.
    pub fn build(self) -> Result<Goal> {
        let action = self.action.build()?;
        if self.repeats && self.time.is_none() {
            return Err(PraxisError::InvalidAction {
                message: format!("Goal {} repeats but has no countdown", action.name()),
            });
        }

        let failures = match self.failures {
            Some(failures) => failures,
            None => Outcomes::fixed(self.failure_updates, self.failure_probs)?,
        };

        Ok(Goal {
            action,
            failures,
            time: self.time,
            deadline: self.time,
            repeats: self.repeats,
        })
    }
}

/// The set of goals an agent is pursuing, keyed by goal name.
///
/// Goals are shared behind `Arc`; removing a goal from one set never
/// affects another.
#[derive(Debug, Clone, Default)]
pub struct GoalSet {
    goals: BTreeMap<String, Arc<Goal>>,
}

impl GoalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a goal, replacing any goal with the same name. Returns true if
    /// the name was not present.
    pub fn insert(&mut self, goal: Arc<Goal>) -> bool {
        self.goals.insert(goal.name().to_string(), goal).is_none()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<Goal>> {
        self.goals.remove(name)
    }

    /// Copy of this set without the named goal.
    pub fn without(&self, name: &str) -> GoalSet {
        let mut next = self.clone();
        next.remove(name);
        next
    }

    /// Union with another set; goals already present are kept.
    pub fn union(&self, other: &GoalSet) -> GoalSet {
        let mut next = self.clone();
        for goal in other.iter() {
            next.goals
                .entry(goal.name().to_string())
                .or_insert_with(|| Arc::clone(goal));
        }
        next
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Goal>> {
        self.goals.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.goals.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Goals in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Goal>> {
        self.goals.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.goals.keys().map(String::as_str)
    }

    pub(crate) fn hash_into<H: Hasher>(&self, hasher: &mut H) {
        for name in self.goals.keys() {
            name.hash(hasher);
        }
    }

    /// Hash of the goal names.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash_into(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for GoalSet {
    fn eq(&self, other: &Self) -> bool {
        self.goals.keys().eq(other.goals.keys())
    }
}

impl FromIterator<Arc<Goal>> for GoalSet {
    fn from_iter<I: IntoIterator<Item = Arc<Goal>>>(iter: I) -> Self {
        let mut set = GoalSet::new();
        for goal in iter {
            set.insert(goal);
        }
        set
    }
}

impl FromIterator<Goal> for GoalSet {
    fn from_iter<I: IntoIterator<Item = Goal>>(iter: I) -> Self {
        iter.into_iter().map(Arc::new).collect()
    }
}
