//! Greedy backtracking plan construction ("hill climbing").
//!
//! Depth-first over pre-ranked successors: the best-ranked extension of a
//! path is always explored first. A step whose prerequisites fail against its
//! predecessor's state is dropped and its choice promoted to a goal.

use std::collections::HashSet;

use praxis_core::{GoalSet, Node, Plan, PlanStep};
use tracing::{debug, info, warn};

use crate::planner::{PlannerConfig, PlanningResult};
use crate::successor::Successors;

/// Hill-climbing search over a successor generator.
pub struct HillClimber<'a> {
    successors: &'a Successors,
    config: &'a PlannerConfig,
}

impl<'a> HillClimber<'a> {
    pub fn new(successors: &'a Successors, config: &'a PlannerConfig) -> Self {
        Self { successors, config }
    }

    /// Build a plan from `root`.
    ///
    /// A branch ends at `depth` steps (capped by `max_steps`), at a dead end,
    /// or where `accept` holds. Without `accept` the first ended branch is the
    /// plan. With it, the first accepted branch is; failing that, the first
    /// branch that ended unaccepted.
    pub fn climb(
        &self,
        root: &Node,
        depth: Option<usize>,
        accept: Option<&dyn Fn(&Node) -> bool>,
    ) -> PlanningResult {
        let depth = depth.map_or(self.config.max_steps, |d| d.min(self.config.max_steps));
        let resolution = self.config.state_resolution;

        let mut fringe: Vec<Vec<PlanStep>> = vec![Vec::new()];
        let mut seen = HashSet::new();
        let mut promoted = GoalSet::new();
        let mut fallback: Option<Vec<PlanStep>> = None;
        let mut deepest: Vec<PlanStep> = Vec::new();
        let mut explored = 0;

        while let Some(path) = fringe.pop() {
            let (node, valid) = match path.split_last() {
                None => (root, true),
                Some((last, rest)) => {
                    let prev = rest.last().map_or(root, |s| &s.node);
                    (&last.node, last.choice.satisfied(&prev.state))
                }
            };

            if !valid {
                if let Some(step) = path.last() {
                    debug!("Promoting infeasible choice '{}' to a goal", step.choice.name());
                    promoted.insert(step.choice.promote());
                }
                continue;
            }

            if !seen.insert(node.fingerprint(resolution)) {
                continue;
            }

            explored += 1;
            if explored > self.config.max_states_explored {
                warn!(
                    "Hill climbing exceeded max states explored ({})",
                    self.config.max_states_explored
                );
                let path = fallback.unwrap_or(if path.len() >= deepest.len() { path } else { deepest });
                return self.finish(root, path, promoted, explored);
            }

            let accepted = accept.map(|f| f(node));
            let successors = if path.len() >= depth {
                Vec::new()
            } else {
                self.successors.successors(node)
            };

            match accepted {
                Some(true) => return self.finish(root, path, promoted, explored),
                None if successors.is_empty() => return self.finish(root, path, promoted, explored),
                Some(false) if successors.is_empty() => {
                    debug!("Branch of {} steps ended unaccepted", path.len());
                    if fallback.is_none() {
                        fallback = Some(path);
                    }
                    continue;
                }
                _ => {}
            }

            if path.len() > deepest.len() {
                deepest = path.clone();
            }

            // Reverse so the best-ranked extension is popped first.
            for transition in successors.into_iter().rev() {
                let mut next = path.clone();
                next.push(PlanStep::new(transition.choice, transition.node));
                fringe.push(next);
            }
        }

        let path = fallback.unwrap_or(deepest);
        self.finish(root, path, promoted, explored)
    }

    fn finish(
        &self,
        root: &Node,
        path: Vec<PlanStep>,
        promoted: GoalSet,
        explored: usize,
    ) -> PlanningResult {
        info!(
            "Hill climbing built plan with {} steps, {} promoted goals, explored {} states",
            path.len(),
            promoted.len(),
            explored
        );
        PlanningResult {
            plan: Plan::new(path),
            goals: root.goals.union(&promoted),
            promoted,
            states_explored: explored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::utility::UtilityTable;
    use praxis_core::{Action, Goal, Prereq, State, Update};

    fn work() -> Arc<Action> {
        Arc::new(
            Action::builder("work")
                .outcome(Update::new().delta("cash", 100.0), 0.5)
                .outcome(Update::new().delta("cash", 50.0), 0.5)
                .build()
                .unwrap(),
        )
    }

    fn hire_help() -> Arc<Action> {
        Arc::new(
            Action::builder("hire help")
                .prereq("cash", Prereq::ge(200))
                .outcome(Update::new().delta("cash", 1000.0), 1.0)
                .build()
                .unwrap(),
        )
    }

    fn money_goal() -> Goal {
        Goal::builder("money")
            .prereq("cash", Prereq::ge(200))
            .outcome(Update::new().delta("cash", 1000.0), 1.0)
            .build()
            .unwrap()
    }

    fn successors(actions: Vec<Arc<Action>>) -> Successors {
        Successors::new(actions, UtilityTable::new().with_numeric("cash", |x| x))
    }

    fn root() -> Node {
        Node::new(
            [("cash", 0.0)].into_iter().collect(),
            vec![money_goal()].into_iter().collect(),
        )
    }

    fn cash_trajectory(result: &PlanningResult) -> Vec<f64> {
        result
            .plan
            .steps()
            .iter()
            .map(|s| s.state().num("cash").unwrap())
            .collect()
    }

    #[test]
    fn test_greedy_plan_expected_values() {
        let successors = successors(vec![work()]);
        let config = PlannerConfig::default();
        let result = HillClimber::new(&successors, &config).climb(&root(), Some(3), None);

        assert_eq!(result.plan.names(), vec!["work", "work", "work"]);
        assert_eq!(cash_trajectory(&result), vec![75.0, 150.0, 225.0]);
        assert!(result.plan.steps().iter().all(|s| s.goals().contains("money")));
        assert!(result.promoted.is_empty());
    }

    #[test]
    fn test_goal_fulfilled_once_prereqs_met() {
        let successors = successors(vec![work()]);
        let config = PlannerConfig::default();
        let result = HillClimber::new(&successors, &config).climb(&root(), Some(4), None);

        assert_eq!(result.plan.names(), vec!["work", "work", "work", "money"]);
        assert_eq!(cash_trajectory(&result), vec![75.0, 150.0, 225.0, 1225.0]);
        let last = result.plan.steps().last().unwrap();
        assert!(last.choice.is_goal());
        assert!(last.goals().is_empty());
    }

    #[test]
    fn test_infeasible_action_promoted() {
        let successors = successors(vec![work(), hire_help()]);
        let config = PlannerConfig::default();
        let result = HillClimber::new(&successors, &config).climb(&root(), Some(3), None);

        assert_eq!(cash_trajectory(&result), vec![75.0, 150.0, 225.0]);
        assert!(!result.plan.names().contains(&"hire help"));
        assert!(result.promoted.contains("hire help"));
        assert_eq!(result.promoted.len(), 1);
        assert_eq!(result.goals.names().collect::<Vec<_>>(), vec!["hire help", "money"]);
    }

    #[test]
    fn test_promotion_keeps_existing_goal() {
        let windfall = Arc::new(
            Action::builder("money")
                .prereq("cash", Prereq::ge(200))
                .outcome(Update::new().delta("cash", 1000.0), 1.0)
                .build()
                .unwrap(),
        );
        let timed = Goal::builder("money")
            .prereq("cash", Prereq::ge(500))
            .outcome(Update::new().delta("cash", 1000.0), 1.0)
            .time(5)
            .build()
            .unwrap();
        let successors = successors(vec![work(), windfall]);
        let config = PlannerConfig::default();
        let root = Node::new(
            [("cash", 0.0)].into_iter().collect(),
            vec![timed].into_iter().collect(),
        );
        let result = HillClimber::new(&successors, &config).climb(&root, Some(3), None);

        assert!(result.promoted.contains("money"));
        assert_eq!(result.goals.len(), 1);
        assert_eq!(result.goals.get("money").and_then(|g| g.time()), Some(5));
    }

    #[test]
    fn test_revisited_state_is_skipped() {
        let wait = Arc::new(
            Action::builder("wait")
                .outcome(Update::new().delta("cash", 0.0), 1.0)
                .build()
                .unwrap(),
        );
        let spend = Arc::new(
            Action::builder("spend")
                .outcome(Update::new().delta("cash", -10.0), 1.0)
                .build()
                .unwrap(),
        );
        let successors = successors(vec![wait, spend]);
        let config = PlannerConfig::default();
        let root = Node::new([("cash", 100.0)].into_iter().collect(), GoalSet::new());

        // Waiting ranks first but lands on an already visited state every time.
        assert_eq!(successors.successors(&root)[0].choice.name(), "wait");
        let result = HillClimber::new(&successors, &config).climb(&root, Some(2), None);

        assert_eq!(result.plan.names(), vec!["spend", "spend"]);
        assert_eq!(cash_trajectory(&result), vec![90.0, 80.0]);
    }

    #[test]
    fn test_large_values_are_not_confused() {
        let earn = Arc::new(
            Action::builder("earn")
                .outcome(Update::new().delta("cash", 1e14), 1.0)
                .build()
                .unwrap(),
        );
        let successors = successors(vec![earn]);
        let config = PlannerConfig::default();
        let root = Node::new([("cash", 1e14)].into_iter().collect(), GoalSet::new());
        let result = HillClimber::new(&successors, &config).climb(&root, Some(3), None);

        assert_eq!(result.plan.names(), vec!["earn", "earn", "earn"]);
        assert_eq!(cash_trajectory(&result), vec![2e14, 3e14, 4e14]);
    }

    #[test]
    fn test_dead_end_root_yields_empty_plan() {
        let successors = successors(vec![hire_help()]);
        let config = PlannerConfig::default();
        let root = Node::new([("cash", 0.0)].into_iter().collect(), GoalSet::new());
        let result = HillClimber::new(&successors, &config).climb(&root, Some(3), None);

        assert!(result.plan.is_empty());
        assert!(result.promoted.contains("hire help"));
    }

    #[test]
    fn test_acceptance_predicate() {
        let tick = Arc::new(
            Action::builder("tick")
                .outcome(Update::new().delta("hour", 1.0).delta("cash", 10.0), 1.0)
                .build()
                .unwrap(),
        );
        let nap = Arc::new(
            Action::builder("nap")
                .outcome(Update::new().delta("hour", 2.0), 1.0)
                .build()
                .unwrap(),
        );
        let successors = successors(vec![tick, nap]);
        let config = PlannerConfig::default();
        let root = Node::new(
            [("cash", 0.0), ("hour", 0.0)].into_iter().collect::<State>(),
            GoalSet::new(),
        );

        let end_of_day = |node: &Node| node.state.num("hour") == Some(5.0);
        let result =
            HillClimber::new(&successors, &config).climb(&root, Some(5), Some(&end_of_day));

        assert_eq!(result.plan.final_state().and_then(|s| s.num("hour")), Some(5.0));
        assert_eq!(result.plan.names(), vec!["tick", "tick", "tick", "tick", "tick"]);

        // Ticking runs out of depth at hour five; backtracking swaps the last tick for a nap.
        let at_six = |node: &Node| node.state.num("hour") == Some(6.0);
        let result = HillClimber::new(&successors, &config).climb(&root, Some(5), Some(&at_six));
        assert_eq!(result.plan.final_state().and_then(|s| s.num("hour")), Some(6.0));
        assert_eq!(result.plan.names(), vec!["tick", "tick", "tick", "tick", "nap"]);
    }

    #[test]
    fn test_unaccepted_search_returns_fallback() {
        let successors = successors(vec![work()]);
        let config = PlannerConfig::default();
        let never = |_: &Node| false;
        let result = HillClimber::new(&successors, &config).climb(&root(), Some(2), Some(&never));

        assert_eq!(cash_trajectory(&result), vec![75.0, 150.0]);
    }

    #[test]
    fn test_state_budget_returns_partial_plan() {
        let successors = successors(vec![work()]);
        let config = PlannerConfig {
            max_states_explored: 3,
            ..PlannerConfig::default()
        };
        let result = HillClimber::new(&successors, &config).climb(&root(), None, None);

        assert_eq!(result.plan.len(), 3);
    }
}
