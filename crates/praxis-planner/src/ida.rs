//! Iterative-deepening A* subplanning.
//!
//! Finds a minimum-distance path to a state satisfying a target action's
//! prerequisites. Edge distance rewards utility-gaining moves and penalises
//! utility-losing ones quadratically, so the search prefers cheap, beneficial
//! routes.

use std::collections::HashMap;

use praxis_core::{Action, Node, Plan, PlanStep};
use tracing::{debug, info, warn};

use crate::planner::PlannerConfig;
use crate::successor::Successors;

/// Estimate of the remaining distance from a node to a target.
///
/// Implementations must be admissible: never overestimate.
pub trait Heuristic: Send + Sync {
    fn estimate(&self, node: &Node, target: &Action) -> f64;
}

/// The always-admissible zero estimate; degenerates IDA* into bounded
/// uniform-cost search.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroHeuristic;

impl Heuristic for ZeroHeuristic {
    fn estimate(&self, _node: &Node, _target: &Action) -> f64 {
        0.0
    }
}

impl<F> Heuristic for F
where
    F: Fn(&Node, &Action) -> f64 + Send + Sync,
{
    fn estimate(&self, node: &Node, target: &Action) -> f64 {
        self(node, target)
    }
}

/// Distance of one edge given the action's cost and the transition's utility.
pub fn edge_distance(cost: f64, utility: f64) -> f64 {
    if utility < 0.0 {
        cost * utility.powi(2)
    } else {
        cost * 0.1 * ((-utility).tanh() + 1.0)
    }
}

/// A path found by subplanning.
#[derive(Debug, Clone)]
pub struct Subplan {
    pub plan: Plan,
    /// Total edge distance of the path.
    pub distance: f64,
    /// Bound of the deepening pass that found the path.
    pub bound: f64,
    pub states_explored: usize,
}

/// Mutable bookkeeping for one deepening pass.
struct Pass {
    bound: f64,
    path: Vec<PlanStep>,
    seen: HashMap<u64, f64>,
    best: Option<(Vec<PlanStep>, f64)>,
    next_bound: f64,
    exhausted: bool,
}

impl Pass {
    fn new(bound: f64) -> Self {
        Self {
            bound,
            path: Vec::new(),
            seen: HashMap::new(),
            best: None,
            next_bound: f64::INFINITY,
            exhausted: false,
        }
    }
}

/// IDA* search over a successor generator.
pub struct IdaStar<'a> {
    successors: &'a Successors,
    config: &'a PlannerConfig,
    heuristic: &'a dyn Heuristic,
}

impl<'a> IdaStar<'a> {
    pub fn new(
        successors: &'a Successors,
        config: &'a PlannerConfig,
        heuristic: &'a dyn Heuristic,
    ) -> Self {
        Self {
            successors,
            config,
            heuristic,
        }
    }

    /// Search from `root` for a state satisfying `target`'s prerequisites.
    ///
    /// Returns `None` when the deepening or node budget runs out, or when the
    /// reachable space is exhausted without a solution.
    pub fn search(&self, root: &Node, target: &Action) -> Option<Subplan> {
        let mut bound = self.heuristic.estimate(root, target);
        let mut explored = 0;

        for iteration in 0..self.config.max_bound_iterations {
            let mut pass = Pass::new(bound);
            self.descend(&mut pass, root, 0.0, target, &mut explored);

            if let Some((steps, distance)) = pass.best {
                info!(
                    "IDA* found subplan for '{}' with {} steps, distance {:.4}, bound {}, explored {} states",
                    target.name(),
                    steps.len(),
                    distance,
                    bound,
                    explored
                );
                return Some(Subplan {
                    plan: Plan::new(steps),
                    distance,
                    bound,
                    states_explored: explored,
                });
            }
            if pass.exhausted {
                warn!(
                    "IDA* exceeded max states explored ({}) for '{}'",
                    self.config.max_states_explored,
                    target.name()
                );
                return None;
            }
            if pass.next_bound.is_infinite() {
                debug!("IDA* exhausted reachable states for '{}'", target.name());
                return None;
            }

            debug!("IDA* pass {} failed at bound {}", iteration, bound);
            bound += self.config.bound_step;
        }

        warn!(
            "IDA* exceeded max bound iterations ({}) for '{}'",
            self.config.max_bound_iterations,
            target.name()
        );
        None
    }

    fn descend(&self, pass: &mut Pass, node: &Node, g: f64, target: &Action, explored: &mut usize) {
        let f = g + self.heuristic.estimate(node, target);
        if f > pass.bound {
            pass.next_bound = pass.next_bound.min(f);
            return;
        }
        if let Some((_, best)) = &pass.best {
            if f >= *best {
                return;
            }
        }
        if target.satisfied(&node.state) {
            pass.best = Some((pass.path.clone(), g));
            return;
        }
        if pass.path.len() >= self.config.max_steps {
            return;
        }

        let fingerprint = node.fingerprint(self.config.state_resolution);
        // Revisit only through a strictly cheaper path.
        if pass.seen.get(&fingerprint).is_some_and(|&prev| prev <= g) {
            return;
        }
        pass.seen.insert(fingerprint, g);

        *explored += 1;
        if *explored > self.config.max_states_explored {
            pass.exhausted = true;
            return;
        }

        for transition in self.successors.successors(node) {
            let utility = self
                .successors
                .utilities()
                .transition_utility(&node.state, &transition.node.state);
            let step = edge_distance(transition.choice.cost(), utility);
            let next = transition.node.clone();

            pass.path.push(PlanStep::new(transition.choice, transition.node));
            self.descend(pass, &next, g + step, target, explored);
            pass.path.pop();

            if pass.exhausted {
                return;
            }
        }
    }
}
