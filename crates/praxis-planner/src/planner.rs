//! Planner trait and configuration.

use std::sync::Arc;

use praxis_core::{Goal, GoalSet, Node, Plan, PraxisError, Result, State};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::hill::HillClimber;
use crate::ida::{Heuristic, IdaStar, Subplan, ZeroHeuristic};
use crate::successor::Successors;

/// Configuration for the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Maximum number of steps in a plan or subplan.
    pub max_steps: usize,

    /// Maximum number of nodes expanded by a single search.
    pub max_states_explored: usize,

    /// Maximum number of IDA* deepening passes before a goal is deemed unreachable.
    pub max_bound_iterations: usize,

    /// Amount the IDA* bound grows after each failed pass.
    pub bound_step: f64,

    /// Quantum numeric attributes are rounded to when fingerprinting visited states.
    pub state_resolution: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            max_states_explored: 10_000,
            max_bound_iterations: 100,
            bound_step: 1.0,
            state_resolution: 1e-6,
        }
    }
}

impl PlannerConfig {
    /// Reject limits no search can run under.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(PraxisError::InvalidConfig {
                message: message.to_string(),
            })
        };
        if self.max_steps == 0 {
            return invalid("max_steps must be positive");
        }
        if self.max_states_explored == 0 {
            return invalid("max_states_explored must be positive");
        }
        if self.max_bound_iterations == 0 {
            return invalid("max_bound_iterations must be positive");
        }
        if !(self.bound_step.is_finite() && self.bound_step > 0.0) {
            return invalid("bound_step must be a positive number");
        }
        if !(self.state_resolution.is_finite() && self.state_resolution > 0.0) {
            return invalid("state_resolution must be a positive number");
        }
        Ok(())
    }
}

/// Result of plan construction.
#[derive(Debug, Clone, Default)]
pub struct PlanningResult {
    /// The executable path, possibly empty.
    pub plan: Plan,

    /// Goals promoted from desired but infeasible actions.
    pub promoted: GoalSet,

    /// The root's goals together with the promoted ones. Where names clash
    /// the root's goal is kept.
    pub goals: GoalSet,

    /// Number of nodes expanded during the search.
    pub states_explored: usize,
}

/// Trait for planning engines.
pub trait Planner: Send + Sync {
    /// Build a plan from `root` by greedy backtracking search, up to `depth` steps.
    fn plan(&self, root: &Node, depth: Option<usize>) -> PlanningResult;

    /// Build a plan that ends in a node satisfying `accept`.
    fn plan_until(
        &self,
        root: &Node,
        depth: Option<usize>,
        accept: &dyn Fn(&Node) -> bool,
    ) -> PlanningResult;

    /// Find a minimum-distance path from `root` to a state satisfying the
    /// goal's prerequisites. `None` means the goal is currently unreachable.
    fn subplan(&self, root: &Node, goal: &Goal) -> Option<Subplan>;

    /// Check that every step of a plan is feasible along its expected trajectory.
    fn validate_plan(&self, plan: &Plan, state: &State) -> bool;

    /// Get the planner configuration.
    fn config(&self) -> &PlannerConfig;

    /// Update the planner configuration.
    fn set_config(&mut self, config: PlannerConfig);
}

/// Planner ranking successors by multi-attribute utility.
#[derive(Clone)]
pub struct UtilityPlanner {
    config: PlannerConfig,
    successors: Successors,
    heuristic: Arc<dyn Heuristic>,
}

impl std::fmt::Debug for UtilityPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtilityPlanner")
            .field("config", &self.config)
            .field("successors", &self.successors)
            .finish_non_exhaustive()
    }
}

impl UtilityPlanner {
    /// Create a planner with default configuration.
    pub fn new(successors: Successors) -> Self {
        Self::with_config(successors, PlannerConfig::default())
    }

    /// Create a planner with custom configuration.
    pub fn with_config(successors: Successors, config: PlannerConfig) -> Self {
        Self {
            config,
            successors,
            heuristic: Arc::new(ZeroHeuristic),
        }
    }

    /// Use a tighter admissible heuristic for subplanning.
    pub fn with_heuristic<H: Heuristic + 'static>(mut self, heuristic: H) -> Self {
        self.heuristic = Arc::new(heuristic);
        self
    }

    pub fn successors(&self) -> &Successors {
        &self.successors
    }

    fn climber(&self) -> HillClimber<'_> {
        HillClimber::new(&self.successors, &self.config)
    }
}

impl Planner for UtilityPlanner {
    fn plan(&self, root: &Node, depth: Option<usize>) -> PlanningResult {
        self.climber().climb(root, depth, None)
    }

    fn plan_until(
        &self,
        root: &Node,
        depth: Option<usize>,
        accept: &dyn Fn(&Node) -> bool,
    ) -> PlanningResult {
        self.climber().climb(root, depth, Some(accept))
    }

    fn subplan(&self, root: &Node, goal: &Goal) -> Option<Subplan> {
        info!("Subplanning for goal '{}'", goal.name());
        let target = goal.as_action();
        IdaStar::new(&self.successors, &self.config, self.heuristic.as_ref()).search(root, &target)
    }

    fn validate_plan(&self, plan: &Plan, state: &State) -> bool {
        let mut state = state.clone();
        for step in plan.steps() {
            if !step.choice.satisfied(&state) {
                debug!("Plan step '{}' no longer feasible", step.choice.name());
                return false;
            }
            state = self.successors.expected_state(&step.choice, &state);
        }
        true
    }

    fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn set_config(&mut self, config: PlannerConfig) {
        self.config = config;
    }
}
