//! Actions and the builder used to author them.

use rand::RngCore;

use crate::error::{PraxisError, Result};
use crate::outcome::{Outcomes, Update};
use crate::prereq::{Prereq, Prereqs};
use crate::state::State;

/// Something an agent can do: prerequisites plus a distribution of outcomes.
///
/// Actions hold no mutable state and are shared read-only across agents.
#[derive(Debug, Clone)]
pub struct Action {
    name: String,
    prereqs: Prereqs,
    outcomes: Outcomes,
    cost: f64,
    duration: u32,
}

/// Result of executing an action against a concrete state.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Prerequisites held; this is the resolved (sampled) next state.
    Applied(State),
    /// Prerequisites did not hold for the listed attributes.
    PrereqFailed { unsatisfied: Vec<String> },
}

impl ActionOutcome {
    /// Convert into a `Result`, mapping prerequisite failure to
    /// [`PraxisError::PrereqsUnsatisfied`].
    pub fn into_result(self, action: &str) -> Result<State> {
        match self {
            ActionOutcome::Applied(state) => Ok(state),
            ActionOutcome::PrereqFailed { .. } => Err(PraxisError::PrereqsUnsatisfied {
                action: action.to_string(),
            }),
        }
    }
}

impl Action {
    /// Create an action with unit cost and a one-tick duration.
    pub fn new(name: impl Into<String>, prereqs: Prereqs, outcomes: Outcomes) -> Self {
        Self {
            name: name.into(),
            prereqs,
            outcomes,
            cost: 1.0,
            duration: 1,
        }
    }

    /// Create a new ActionBuilder.
    pub fn builder(name: impl Into<String>) -> ActionBuilder {
        ActionBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prereqs(&self) -> &Prereqs {
        &self.prereqs
    }

    pub fn outcomes(&self) -> &Outcomes {
        &self.outcomes
    }

    /// Edge-cost multiplier used by goal-directed search.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Ticks the action occupies once started.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Check whether the action can be taken from `state`.
    pub fn satisfied(&self, state: &State) -> bool {
        self.prereqs.satisfied(state)
    }

    /// Expected next state, used for lookahead.
    pub fn expected_state(&self, state: &State) -> State {
        self.outcomes.expected_state(state)
    }

    /// Execute the action: check prerequisites, then resolve one outcome.
    pub fn apply(&self, state: &State, rng: &mut dyn RngCore) -> ActionOutcome {
        if !self.satisfied(state) {
            return ActionOutcome::PrereqFailed {
                unsatisfied: self
                    .prereqs
                    .unsatisfied(state)
                    .into_iter()
                    .map(String::from)
                    .collect(),
            };
        }
        ActionOutcome::Applied(self.outcomes.resolve(state, rng))
    }
}

/// Builder for creating Actions with a fluent API.
#[derive(Debug)]
pub struct ActionBuilder {
    name: String,
    prereqs: Prereqs,
    outcomes: Option<Outcomes>,
    updates: Vec<Update>,
    probs: Vec<f64>,
    cost: f64,
    duration: u32,
}

impl ActionBuilder {
    /// Create a new ActionBuilder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prereqs: Prereqs::new(),
            outcomes: None,
            updates: Vec::new(),
            probs: Vec::new(),
            cost: 1.0,
            duration: 1,
        }
    }

    /// Add a prerequisite on an attribute.
    pub fn prereq(mut self, attribute: impl Into<String>, prereq: Prereq) -> Self {
        self.prereqs = self.prereqs.with(attribute, prereq);
        self
    }

    /// Replace all prerequisites.
    pub fn prereqs(mut self, prereqs: Prereqs) -> Self {
        self.prereqs = prereqs;
        self
    }

    /// Add one outcome with a fixed probability.
    pub fn outcome(mut self, update: Update, probability: f64) -> Self {
        self.updates.push(update);
        self.probs.push(probability);
        self
    }

    /// Use a prebuilt outcome set instead of individual outcomes.
    pub fn outcomes(mut self, outcomes: Outcomes) -> Self {
        self.outcomes = Some(outcomes);
        self
    }

    /// Set the edge-cost multiplier.
    pub fn cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Set the duration in ticks.
    pub fn duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Build the Action, validating its outcome set.
    pub fn build(self) -> Result<Action> {
        if self.name.trim().is_empty() {
            return Err(PraxisError::InvalidAction {
                message: "Action name cannot be empty".to_string(),
            });
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(PraxisError::InvalidAction {
                message: format!("Action {} has invalid cost {}", self.name, self.cost),
            });
        }

        let outcomes = match self.outcomes {
            Some(outcomes) if self.updates.is_empty() => outcomes,
            Some(_) => {
                return Err(PraxisError::InvalidAction {
                    message: format!(
                        "Action {} mixes an outcome set with individual outcomes",
                        self.name
                    ),
                })
            }
            None => Outcomes::fixed(self.updates, self.probs)?,
        };

        Ok(Action {
            name: self.name,
            prereqs: self.prereqs,
            outcomes,
            cost: self.cost,
            duration: self.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn work() -> Action {
        Action::builder("work")
            .prereq("employed", Prereq::eq(true))
            .outcome(Update::new().delta("cash", 100.0), 0.5)
            .outcome(Update::new().delta("cash", 50.0), 0.5)
            .duration(4)
            .build()
            .unwrap()
    }

    #[test]
    fn test_action_builder() {
        let action = work();
        assert_eq!(action.name(), "work");
        assert_eq!(action.duration(), 4);
        assert_eq!(action.cost(), 1.0);
        assert_eq!(action.outcomes().updates().len(), 2);
    }

    #[test]
    fn test_action_builder_rejects_malformed_outcomes() {
        let result = Action::builder("gamble")
            .outcome(Update::new().delta("cash", 100.0), 0.9)
            .outcome(Update::new().delta("cash", -100.0), 0.9)
            .build();
        assert!(matches!(result, Err(PraxisError::MalformedOutcomes { .. })));

        assert!(Action::builder("  ").build().is_err());
        assert!(Action::builder("rest").cost(-1.0).build().is_err());
    }

    #[test]
    fn test_expected_state() {
        let state: State = [("cash", 0.0)].into_iter().collect();
        assert_eq!(work().expected_state(&state).num("cash"), Some(75.0));
    }

    #[test]
    fn test_apply_checks_prereqs() {
        let mut rng = StdRng::seed_from_u64(11);
        let unemployed = State::from_iter([
            ("cash", crate::Value::from(0.0)),
            ("employed", crate::Value::from(false)),
        ]);

        let outcome = work().apply(&unemployed, &mut rng);
        assert_eq!(
            outcome,
            ActionOutcome::PrereqFailed {
                unsatisfied: vec!["employed".to_string()]
            }
        );
        assert!(matches!(
            outcome.into_result("work"),
            Err(PraxisError::PrereqsUnsatisfied { .. })
        ));

        let employed = unemployed.with("employed", true);
        match work().apply(&employed, &mut rng) {
            ActionOutcome::Applied(next) => {
                let cash = next.num("cash").unwrap();
                assert!(cash == 100.0 || cash == 50.0);
            }
            other => panic!("expected applied outcome, got {:?}", other),
        }
    }
}
