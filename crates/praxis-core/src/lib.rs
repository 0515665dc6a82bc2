//! # Praxis Core
//!
//! Core primitives for the Praxis decision-theoretic planner.
//!
//! This crate provides the fundamental building blocks:
//! - [`State`] - Attribute mapping an agent plans over
//! - [`Prereq`] / [`Prereqs`] - Constraints with a graded distance to satisfaction
//! - [`Outcomes`] - Stochastic effects with sampled and expected resolution
//! - [`Action`] / [`Goal`] - What agents do and what they pursue
//! - [`Plan`] - Sequence of chosen steps with their expected nodes
//! - [`Constraints`] - Attenuation rules for attribute ranges and types
//! - [`PraxisError`] - Error types

pub mod action;
pub mod attenuate;
pub mod error;
pub mod goal;
pub mod outcome;
pub mod plan;
pub mod prereq;
pub mod state;
pub mod types;

// Re-exports for convenience
pub use action::{Action, ActionBuilder, ActionOutcome};
pub use attenuate::{AttributeType, Constraint, Constraints};
pub use error::{PraxisError, Result};
pub use goal::{Goal, GoalBuilder, GoalProgress, GoalSet};
pub use outcome::{Delta, Distribution, Outcomes, Update};
pub use plan::{Choice, Node, Plan, PlanStep};
pub use prereq::{Comparator, Prereq, Prereqs};
pub use state::State;
pub use types::{Value, ValueKind};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::action::{Action, ActionOutcome};
    pub use crate::attenuate::{AttributeType, Constraint, Constraints};
    pub use crate::error::{PraxisError, Result};
    pub use crate::goal::{Goal, GoalProgress, GoalSet};
    pub use crate::outcome::{Delta, Outcomes, Update};
    pub use crate::plan::{Choice, Node, Plan, PlanStep};
    pub use crate::prereq::{Prereq, Prereqs};
    pub use crate::state::State;
    pub use crate::types::Value;
}
