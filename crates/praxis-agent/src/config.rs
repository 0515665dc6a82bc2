//! Agent configuration.

use praxis_core::{PraxisError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for an agent shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Steps per constructed plan; `None` plans until a dead end or acceptance.
    pub plan_depth: Option<usize>,

    /// Replans allowed within one tick after a plan step turns out infeasible.
    pub max_replans: usize,

    /// Seed for outcome sampling. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            plan_depth: Some(24),
            max_replans: 1,
            seed: None,
        }
    }
}

impl AgentConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_plan_depth(mut self, depth: Option<usize>) -> Self {
        self.plan_depth = depth;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.plan_depth == Some(0) {
            return Err(PraxisError::InvalidConfig {
                message: "plan_depth must be positive when set".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.plan_depth, Some(24));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config: AgentConfig = serde_json::from_str(r#"{"seed": 7, "plan_depth": null}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.plan_depth, None);
        assert_eq!(config.max_replans, 1);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let config = AgentConfig::default().with_plan_depth(Some(0));
        assert!(config.validate().is_err());
    }
}
