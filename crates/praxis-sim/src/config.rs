//! Simulation configuration.

use std::path::Path;

use anyhow::Context;
use praxis_agent::AgentConfig;
use praxis_core::{Constraints, State};
use praxis_planner::PlannerConfig;
use serde::{Deserialize, Serialize};

use crate::domain;

/// Configuration for a simulation run. Every field is optional in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of independent agents.
    pub agents: usize,

    /// Simulated days.
    pub days: u32,

    /// Base seed; agent `i` samples with `seed + i`.
    pub seed: u64,

    /// Starting state of every agent.
    pub initial_state: State,

    /// Attenuation rules.
    pub constraints: Constraints,

    pub planner: PlannerConfig,

    pub agent: AgentConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            agents: 4,
            days: 3,
            seed: 42,
            initial_state: domain::initial_state(),
            constraints: domain::constraints(),
            planner: PlannerConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load from a JSON file, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.agents > 0, "agents must be positive");
        self.planner.validate()?;
        self.agent.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::load(None).unwrap();
        assert_eq!(config.agents, 4);
        assert_eq!(config.initial_state.num("cash"), Some(150.0));
    }

    #[test]
    fn test_partial_json() {
        let config: SimConfig = serde_json::from_str(
            r#"{
                "agents": 2,
                "initial_state": {"cash": 900, "employed": true, "hour": 0},
                "planner": {"max_states_explored": 500}
            }"#,
        )
        .unwrap();

        assert_eq!(config.agents, 2);
        assert_eq!(config.days, 3);
        assert_eq!(config.initial_state.num("cash"), Some(900.0));
        assert_eq!(config.planner.max_states_explored, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_agents_rejected() {
        let config = SimConfig {
            agents: 0,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
