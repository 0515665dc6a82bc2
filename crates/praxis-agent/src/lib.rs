//! # Praxis Agent
//!
//! Agent shell over the Praxis planner: attenuated state access, plan
//! construction with goal promotion, goal subplanning, and a tick-driven
//! execution loop that replans when the world diverges from the plan.

pub mod agent;
pub mod config;

pub use agent::{AcceptFn, Agent, GoalExpiry, StepReport};
pub use config::AgentConfig;
