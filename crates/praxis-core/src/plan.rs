//! Search nodes and plans.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::Arc;

use crate::action::Action;
use crate::goal::{Goal, GoalSet};
use crate::outcome::Outcomes;
use crate::prereq::Prereqs;
use crate::state::State;

/// What a plan step does: take an action, or cash in a satisfied goal.
#[derive(Debug, Clone)]
pub enum Choice {
    Action(Arc<Action>),
    Goal(Arc<Goal>),
}

impl Choice {
    pub fn name(&self) -> &str {
        match self {
            Choice::Action(a) => a.name(),
            Choice::Goal(g) => g.name(),
        }
    }

    pub fn prereqs(&self) -> &Prereqs {
        match self {
            Choice::Action(a) => a.prereqs(),
            Choice::Goal(g) => g.prereqs(),
        }
    }

    /// Outcomes of taking the action, or of achieving the goal.
    pub fn outcomes(&self) -> &Outcomes {
        match self {
            Choice::Action(a) => a.outcomes(),
            Choice::Goal(g) => g.outcomes(),
        }
    }

    pub fn cost(&self) -> f64 {
        match self {
            Choice::Action(a) => a.cost(),
            Choice::Goal(g) => g.cost(),
        }
    }

    pub fn duration(&self) -> u32 {
        match self {
            Choice::Action(a) => a.duration(),
            Choice::Goal(g) => g.duration(),
        }
    }

    pub fn is_goal(&self) -> bool {
        matches!(self, Choice::Goal(_))
    }

    pub fn satisfied(&self, state: &State) -> bool {
        self.prereqs().satisfied(state)
    }

    /// Goal a desired but currently infeasible choice is promoted into.
    pub fn promote(&self) -> Arc<Goal> {
        match self {
            Choice::Action(a) => Arc::new(Goal::from_action(a)),
            Choice::Goal(g) => Arc::clone(g),
        }
    }
}

/// A point in the search space: a state and the goals still active in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub state: State,
    pub goals: GoalSet,
}

impl Node {
    pub fn new(state: State, goals: GoalSet) -> Self {
        Self { state, goals }
    }

    /// Hash of the state (numeric attributes quantised to `resolution`) and
    /// the active goal names.
    pub fn fingerprint(&self, resolution: f64) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.state.hash_into(&mut hasher, resolution);
        self.goals.hash_into(&mut hasher);
        hasher.finish()
    }
}

/// One step of a plan and the node it is expected to lead to.
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub choice: Choice,
    pub node: Node,
}

impl PlanStep {
    pub fn new(choice: Choice, node: Node) -> Self {
        Self { choice, node }
    }

    /// Expected state after this step.
    pub fn state(&self) -> &State {
        &self.node.state
    }

    /// Goals still active after this step.
    pub fn goals(&self) -> &GoalSet {
        &self.node.goals
    }
}

/// An ordered sequence of steps produced by a planner.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<PlanStep> {
        self.steps
    }

    /// Names of the chosen actions and goals, in order.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.choice.name()).collect()
    }

    /// Expected state at the end of the plan.
    pub fn final_state(&self) -> Option<&State> {
        self.steps.last().map(PlanStep::state)
    }
}

impl IntoIterator for Plan {
    type Item = PlanStep;
    type IntoIter = std::vec::IntoIter<PlanStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}
