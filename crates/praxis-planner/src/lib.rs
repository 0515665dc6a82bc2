//! # Praxis Planner
//!
//! Utility-driven planning over the Praxis data model.
//!
//! - [`UtilityTable`] scores states, transitions and goals
//! - [`Successors`] enumerates and ranks next nodes
//! - [`IdaStar`] finds minimum-distance subplans to a single goal
//! - [`HillClimber`] builds full plans by greedy backtracking search
//! - [`UtilityPlanner`] ties them together behind the [`Planner`] trait

pub mod hill;
pub mod ida;
pub mod planner;
pub mod successor;
pub mod utility;

pub use hill::HillClimber;
pub use ida::{edge_distance, Heuristic, IdaStar, Subplan, ZeroHeuristic};
pub use planner::{Planner, PlannerConfig, PlanningResult, UtilityPlanner};
pub use successor::{ActionFilter, Successors, Transition};
pub use utility::{UtilityFn, UtilityTable, EPSILON};
