//! Simulation engine: steps independent agents concurrently, one blocking
//! task per agent.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Days, NaiveDate};
use praxis_agent::{Agent, StepReport};
use praxis_core::GoalSet;
use praxis_planner::UtilityPlanner;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SimConfig;
use crate::domain::{self, HOURS_IN_DAY};

/// What one agent did over the whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub id: Uuid,
    pub state: praxis_core::State,
    pub goals: Vec<String>,
    pub diary: Vec<String>,
    pub executed: usize,
    pub idle: usize,
    pub replans: usize,
    pub expired_goals: usize,
}

/// The simulation engine.
pub struct Engine {
    config: SimConfig,
    planner: Arc<UtilityPlanner>,
    start: NaiveDate,
}

impl Engine {
    /// Create a new engine, building the shared planner catalogs once.
    pub fn new(config: SimConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let planner = domain::planner(config.constraints.clone(), config.planner.clone())?;
        let start = domain::start_date().context("invalid start date")?;
        Ok(Self {
            config,
            planner: Arc::new(planner),
            start,
        })
    }

    fn spawn_agents(&self) -> anyhow::Result<Vec<Agent>> {
        let rent = Arc::new(domain::pay_rent()?);
        Ok((0..self.config.agents)
            .map(|i| {
                let goals: GoalSet = vec![Arc::clone(&rent)].into_iter().collect();
                let config = self
                    .config
                    .agent
                    .clone()
                    .with_seed(self.config.seed.wrapping_add(i as u64));
                Agent::new(
                    self.config.initial_state.clone(),
                    goals,
                    Arc::clone(&self.planner),
                    config,
                )
                .with_acceptance(domain::end_of_day)
            })
            .collect())
    }

    /// Run every agent through the configured number of days.
    pub async fn run(&self) -> anyhow::Result<Vec<AgentSummary>> {
        info!(
            "🚀 Simulating {} agents for {} days from {}",
            self.config.agents, self.config.days, self.start
        );

        let handles: Vec<_> = self
            .spawn_agents()?
            .into_iter()
            .map(|agent| {
                let days = self.config.days;
                let start = self.start;
                tokio::task::spawn_blocking(move || simulate(agent, days, start))
            })
            .collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            summaries.push(handle.await.context("agent task panicked")?);
        }

        info!("✅ Simulation complete");
        Ok(summaries)
    }
}

/// Step one agent hour by hour. The world clock drives the agent's `hour`
/// attribute whenever it is free to act.
fn simulate(mut agent: Agent, days: u32, start: NaiveDate) -> AgentSummary {
    let mut summary = AgentSummary {
        id: agent.id(),
        state: agent.state(),
        goals: Vec::new(),
        diary: Vec::new(),
        executed: 0,
        idle: 0,
        replans: 0,
        expired_goals: 0,
    };

    for day in 0..days {
        if let Some(date) = start.checked_add_days(Days::new(u64::from(day))) {
            debug!("Agent {} starting {}", agent.id(), date);
        }
        agent.clear_plan();

        for hour in 0..HOURS_IN_DAY {
            if agent.cooldown() == 0 {
                agent.set("hour", f64::from(hour));
            }
            match agent.step() {
                StepReport::Executed { replans, .. } => {
                    summary.executed += 1;
                    summary.replans += replans;
                }
                StepReport::Idle { replans } => {
                    summary.idle += 1;
                    summary.replans += replans;
                }
                StepReport::Busy { .. } => {}
            }
            summary.expired_goals += agent.advance_goals(1).len();
        }
    }

    summary.state = agent.state();
    summary.goals = agent.goals().names().map(String::from).collect();
    summary.diary = agent.diary().to_vec();
    info!(
        "Agent {} finished: {} actions, {} idle ticks, cash {:?}",
        summary.id,
        summary.executed,
        summary.idle,
        summary.state.num("cash")
    );
    summary
}
