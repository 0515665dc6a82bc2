//! Successor generation: every reachable next node from a search node,
//! ranked by expected score.

use std::fmt;
use std::sync::Arc;

use praxis_core::{Action, Choice, Constraints, Node, State};
use tracing::trace;

use crate::utility::UtilityTable;

/// Domain filter deciding which catalog actions are candidates in a state.
pub type ActionFilter = Arc<dyn Fn(&State, &Action) -> bool + Send + Sync>;

/// A ranked candidate transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub choice: Choice,
    pub node: Node,
    pub score: f64,
}

/// Enumerates and ranks successors of search nodes.
///
/// Holds the read-only catalogs a planning call needs: actions, utility
/// functions, attenuation rules and the domain's action filter.
#[derive(Clone)]
pub struct Successors {
    actions: Vec<Arc<Action>>,
    utilities: UtilityTable,
    constraints: Constraints,
    filter: Option<ActionFilter>,
}

impl fmt::Debug for Successors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Successors")
            .field(
                "actions",
                &self.actions.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("utilities", &self.utilities)
            .field("constraints", &self.constraints)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl Successors {
    /// Create a generator over an action catalog.
    pub fn new(actions: Vec<Arc<Action>>, utilities: UtilityTable) -> Self {
        Self {
            actions,
            utilities,
            constraints: Constraints::new(),
            filter: None,
        }
    }

    /// Attenuate every successor state with these rules.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Restrict candidate actions per state.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&State, &Action) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn actions(&self) -> &[Arc<Action>] {
        &self.actions
    }

    pub fn utilities(&self) -> &UtilityTable {
        &self.utilities
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Catalog actions the domain admits as candidates in `state`.
    pub fn actions_for_state<'a>(&'a self, state: &'a State) -> impl Iterator<Item = &'a Arc<Action>> {
        self.actions
            .iter()
            .filter(move |a| self.filter.as_ref().map_or(true, |f| f(state, a)))
    }

    /// Attenuated expected state after taking `choice` from `state`.
    pub fn expected_state(&self, choice: &Choice, state: &State) -> State {
        let next = choice.outcomes().expected_state(state);
        self.constraints.attenuate_state(&next)
    }

    /// Every next node from `node`, best first.
    ///
    /// Candidate actions keep the active goal set; each goal satisfied in
    /// `node` yields a transition that removes it. Ties keep enumeration
    /// order (actions in catalog order, then goals by name).
    pub fn successors(&self, node: &Node) -> Vec<Transition> {
        let state = &node.state;
        let mut candidates: Vec<(Choice, Node)> = self
            .actions_for_state(state)
            .map(|action| {
                let choice = Choice::Action(Arc::clone(action));
                let next = self.expected_state(&choice, state);
                (choice, Node::new(next, node.goals.clone()))
            })
            .collect();

        for goal in node.goals.iter().filter(|g| g.satisfied(state)) {
            let choice = Choice::Goal(Arc::clone(goal));
            let next = self.expected_state(&choice, state);
            candidates.push((choice, Node::new(next, node.goals.without(goal.name()))));
        }

        let mut ranked: Vec<Transition> = candidates
            .into_iter()
            .map(|(choice, next)| {
                let score = self
                    .utilities
                    .successor_score(state, &next.state, &node.goals);
                Transition {
                    choice,
                    node: next,
                    score: if score.is_nan() { f64::NEG_INFINITY } else { score },
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        trace!(
            "Ranked {} successors: {:?}",
            ranked.len(),
            ranked.iter().map(|t| t.choice.name()).collect::<Vec<_>>()
        );
        ranked
    }
}
