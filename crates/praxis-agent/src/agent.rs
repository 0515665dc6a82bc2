//! The agent shell: owns a state and goal set, plans over them and executes
//! plans one tick at a time.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use praxis_core::{
    Action, ActionOutcome, Choice, Constraints, Goal, GoalProgress, GoalSet, Node, Plan, PlanStep,
    State, Value,
};
use praxis_planner::{Planner, Subplan, UtilityPlanner};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AgentConfig;

/// Predicate marking a node as an acceptable end of plan.
pub type AcceptFn = Arc<dyn Fn(&Node) -> bool + Send + Sync>;

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum StepReport {
    /// An earlier action is still running; `remaining` ticks are left after this one.
    Busy { remaining: u32 },
    /// A plan step was executed.
    Executed { choice: String, replans: usize },
    /// Nothing executable was found this tick.
    Idle { replans: usize },
}

/// A goal whose countdown ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalExpiry {
    pub goal: String,
    pub renewed: bool,
}

/// An expected-utility maximising agent capable of managing long-term goals.
///
/// The agent owns its state exclusively. Every write is attenuated, and reads
/// hand out copies, so the live state never holds an out-of-range value.
pub struct Agent {
    id: Uuid,
    state: State,
    goals: GoalSet,
    planner: Arc<UtilityPlanner>,
    config: AgentConfig,
    accept: Option<AcceptFn>,
    queue: VecDeque<PlanStep>,
    cooldown: u32,
    rng: StdRng,
    diary: Vec<String>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("goals", &self.goals.names().collect::<Vec<_>>())
            .field("queued", &self.queue.len())
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create an agent. The initial state is attenuated.
    pub fn new(state: State, goals: GoalSet, planner: Arc<UtilityPlanner>, config: AgentConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = planner.successors().constraints().attenuate_state(&state);
        Self {
            id: Uuid::new_v4(),
            state,
            goals,
            planner,
            config,
            accept: None,
            queue: VecDeque::new(),
            cooldown: 0,
            rng,
            diary: Vec::new(),
        }
    }

    /// Only accept plans ending in a node satisfying `accept`.
    pub fn with_acceptance<F>(mut self, accept: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'static,
    {
        self.accept = Some(Arc::new(accept));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn constraints(&self) -> &Constraints {
        self.planner.successors().constraints()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> State {
        self.state.clone()
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.state.get(attribute)
    }

    /// Write one attribute, attenuated per the configured constraints.
    pub fn set(&mut self, attribute: &str, value: impl Into<Value>) {
        let value = self.constraints().attenuate_value(attribute, value.into());
        self.state.insert(attribute, value);
    }

    /// Replace the whole state, attenuated.
    pub fn set_state(&mut self, state: State) {
        self.state = self.constraints().attenuate_state(&state);
    }

    pub fn goals(&self) -> &GoalSet {
        &self.goals
    }

    pub fn add_goal(&mut self, goal: Goal) -> bool {
        self.goals.insert(Arc::new(goal))
    }

    /// Names of executed actions and fulfilled goals, most recent last.
    pub fn diary(&self) -> &[String] {
        &self.diary
    }

    /// Ticks the current action still occupies.
    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Steps of the current plan not yet executed.
    pub fn queued(&self) -> impl Iterator<Item = &PlanStep> {
        self.queue.iter()
    }

    /// Drop the current plan; the next step plans afresh.
    pub fn clear_plan(&mut self) {
        self.queue.clear();
    }

    /// Build a plan from `state` and `goals`, merging promoted goals into the
    /// agent's goal set. Returns the plan with `goals` plus the promoted goals.
    ///
    /// A promoted goal never replaces a goal the agent already holds.
    pub fn plan(&mut self, state: &State, goals: &GoalSet, depth: Option<usize>) -> (Plan, GoalSet) {
        let root = Node::new(state.clone(), goals.clone());
        let result = match &self.accept {
            Some(accept) => self.planner.plan_until(&root, depth, accept.as_ref()),
            None => self.planner.plan(&root, depth),
        };
        for name in result.promoted.names() {
            if !self.goals.contains(name) {
                info!("Agent {} now pursues '{}'", self.id, name);
            }
        }
        self.goals = self.goals.union(&result.promoted);
        (result.plan, result.goals)
    }

    /// Find a path from `state` to one satisfying `goal`'s prerequisites.
    pub fn subplan(&self, state: &State, goal: &Goal) -> Option<Subplan> {
        let root = Node::new(state.clone(), self.goals.clone());
        self.planner.subplan(&root, goal)
    }

    /// Execute an action against the true current state.
    pub fn execute(&mut self, action: &Action) -> ActionOutcome {
        let outcome = action.apply(&self.state, &mut self.rng);
        self.commit(action.name(), action.duration(), outcome)
    }

    /// Cash in a goal whose prerequisites hold in the true current state.
    pub fn fulfil(&mut self, goal: &Goal) -> ActionOutcome {
        let outcome = goal.as_action().apply(&self.state, &mut self.rng);
        let outcome = self.commit(goal.name(), goal.duration(), outcome);
        if matches!(outcome, ActionOutcome::Applied(_)) && self.goals.remove(goal.name()).is_some() {
            info!("Agent {} fulfilled goal '{}'", self.id, goal.name());
        }
        outcome
    }

    fn commit(&mut self, name: &str, duration: u32, outcome: ActionOutcome) -> ActionOutcome {
        match outcome {
            ActionOutcome::Applied(next) => {
                self.set_state(next);
                self.cooldown = duration.saturating_sub(1);
                self.diary.push(name.to_string());
                debug!("Agent {} executed '{}'", self.id, name);
                ActionOutcome::Applied(self.state.clone())
            }
            failed => failed,
        }
    }

    fn replan(&mut self) {
        let state = self.state.clone();
        let goals = self.goals.clone();
        let (plan, _) = self.plan(&state, &goals, self.config.plan_depth);
        self.queue = plan.into_steps().into();
    }

    /// Advance one tick of execution.
    ///
    /// Busy agents count down. Otherwise the next plan step runs against the
    /// true state, planning first if no plan is queued. A step whose
    /// prerequisites no longer hold discards the plan and triggers a replan,
    /// at most `max_replans` times per tick.
    pub fn step(&mut self) -> StepReport {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return StepReport::Busy {
                remaining: self.cooldown,
            };
        }

        if self.queue.is_empty() {
            self.replan();
        }

        let mut replans = 0;
        loop {
            let Some(step) = self.queue.pop_front() else {
                debug!("Agent {} idle", self.id);
                return StepReport::Idle { replans };
            };

            let outcome = match &step.choice {
                Choice::Action(action) => self.execute(action),
                Choice::Goal(goal) => self.fulfil(goal),
            };

            match outcome {
                ActionOutcome::Applied(_) => {
                    return StepReport::Executed {
                        choice: step.choice.name().to_string(),
                        replans,
                    }
                }
                ActionOutcome::PrereqFailed { unsatisfied } => {
                    warn!(
                        "Agent {} cannot '{}' (unsatisfied: {:?}), replanning",
                        self.id,
                        step.choice.name(),
                        unsatisfied
                    );
                    self.queue.clear();
                    if replans >= self.config.max_replans {
                        return StepReport::Idle { replans };
                    }
                    replans += 1;
                    self.replan();
                }
            }
        }
    }

    /// Count down every timed goal by `dt` ticks, applying the failure
    /// outcomes of goals that expire.
    pub fn advance_goals(&mut self, dt: u32) -> Vec<GoalExpiry> {
        let current: Vec<Arc<Goal>> = self.goals.iter().cloned().collect();
        let mut goals = GoalSet::new();
        let mut expired = Vec::new();

        for goal in current {
            match goal.advance(&self.state, dt, &mut self.rng) {
                GoalProgress::Active(next) => {
                    goals.insert(Arc::new(next));
                }
                GoalProgress::Expired { state, renewed } => {
                    info!("Agent {} let goal '{}' expire", self.id, goal.name());
                    self.set_state(state);
                    expired.push(GoalExpiry {
                        goal: goal.name().to_string(),
                        renewed: renewed.is_some(),
                    });
                    if let Some(renewed) = renewed {
                        goals.insert(Arc::new(renewed));
                    }
                }
            }
        }

        self.goals = goals;
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use praxis_core::{Constraint, Prereq, Update};
    use praxis_planner::{Successors, UtilityTable};

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

    fn planner(actions: Vec<Arc<Action>>) -> Arc<UtilityPlanner> {
        let successors = Successors::new(
            actions,
            UtilityTable::new()
                .with_numeric("cash", |x| x)
                .with_numeric("fun", |x| x),
        )
        .with_constraints(Constraints::new().with("stress", Constraint::range(Some(0.0), None)));
        Arc::new(UtilityPlanner::new(successors))
    }

    fn agent(cash: f64, actions: Vec<Arc<Action>>, depth: Option<usize>) -> Agent {
        Agent::new(
            [("cash", cash), ("fun", 0.0), ("stress", 0.0)].into_iter().collect(),
            vec![money_goal()].into_iter().collect(),
            planner(actions),
            AgentConfig::default().with_seed(7).with_plan_depth(depth),
        )
    }

    #[test]
    fn test_state_access_attenuated() {
        let mut agent = agent(0.0, vec![work()], Some(3));
        agent.set("stress", -5.0);
        assert_eq!(agent.get("stress"), Some(&Value::Num(0.0)));

        let mut snapshot = agent.state();
        snapshot.insert("stress", -9.0);
        agent.set_state(snapshot);
        assert_eq!(agent.state().num("stress"), Some(0.0));

        let mut copy = agent.state();
        copy.insert("cash", 1e6);
        assert_eq!(agent.state().num("cash"), Some(0.0));
    }

    #[test]
    fn test_plan() {
        let mut agent = agent(0.0, vec![work(), hire_help()], Some(3));
        let state = agent.state();
        let goals = agent.goals().clone();
        let (plan, planned_goals) = agent.plan(&state, &goals, Some(3));

        let cash: Vec<_> = plan.steps().iter().map(|s| s.state().num("cash").unwrap()).collect();
        assert_eq!(plan.names(), vec!["work", "work", "work"]);
        assert_eq!(cash, vec![75.0, 150.0, 225.0]);

        // The desired but not yet affordable action is now a goal.
        assert_eq!(
            agent.goals().names().collect::<Vec<_>>(),
            vec!["hire help", "money"]
        );
        assert_eq!(
            planned_goals.names().collect::<Vec<_>>(),
            vec!["hire help", "money"]
        );
    }

    #[test]
    fn test_plan_keeps_timed_goal_on_promotion() {
        let cram = Arc::new(
            Action::builder("study")
                .prereq("cash", Prereq::ge(200))
                .outcome(Update::new().delta("cash", 1000.0), 1.0)
                .build()
                .unwrap(),
        );
        let exam = Goal::builder("study")
            .prereq("cash", Prereq::ge(5000))
            .outcome(Update::new().delta("fun", 1.0), 1.0)
            .failure(Update::new().delta("fun", -1.0), 1.0)
            .time(5)
            .build()
            .unwrap();
        let mut agent = Agent::new(
            [("cash", 0.0), ("fun", 0.0)].into_iter().collect(),
            vec![exam].into_iter().collect(),
            planner(vec![work(), cram]),
            AgentConfig::default().with_seed(3),
        );

        let state = agent.state();
        let goals = agent.goals().clone();
        let (plan, planned_goals) = agent.plan(&state, &goals, Some(2));

        assert!(!plan.names().contains(&"study"));
        assert_eq!(agent.goals().len(), 1);
        assert_eq!(agent.goals().get("study").and_then(|g| g.time()), Some(5));
        assert_eq!(planned_goals.get("study").and_then(|g| g.time()), Some(5));

        // The countdown still runs, so the goal can expire.
        for _ in 0..4 {
            assert!(agent.advance_goals(1).is_empty());
        }
        assert_eq!(agent.advance_goals(1).len(), 1);
    }

    #[test]
    fn test_subplan() {
        let agent = agent(0.0, vec![work()], Some(3));
        let subplan = agent.subplan(&agent.state(), &money_goal()).unwrap();

        assert_eq!(subplan.plan.names(), vec!["work", "work", "work"]);
    }

    #[test]
    fn test_step_executes_sampled_outcome() {
        let mut agent = agent(0.0, vec![work()], Some(3));

        assert_eq!(
            agent.step(),
            StepReport::Executed {
                choice: "work".to_string(),
                replans: 0
            }
        );
        let cash = agent.state().num("cash").unwrap();
        assert!(cash == 100.0 || cash == 50.0);
        assert_eq!(agent.diary(), ["work"]);
        assert_eq!(agent.queued().count(), 2);
    }

    #[test]
    fn test_step_replans_on_prereq_failure() {
        let earn = Arc::new(
            Action::builder("earn")
                .outcome(Update::new().delta("cash", 10.0), 1.0)
                .build()
                .unwrap(),
        );
        let shop = Arc::new(
            Action::builder("shop")
                .prereq("cash", Prereq::ge(10))
                .outcome(Update::new().delta("cash", -10.0).delta("fun", 30.0), 1.0)
                .build()
                .unwrap(),
        );
        let mut agent = Agent::new(
            [("cash", 100.0), ("fun", 0.0)].into_iter().collect(),
            GoalSet::new(),
            planner(vec![earn, shop]),
            AgentConfig::default().with_seed(1).with_plan_depth(Some(1)),
        );

        let state = agent.state();
        let (plan, _) = agent.plan(&state, &GoalSet::new(), Some(1));
        assert_eq!(plan.names(), vec!["shop"]);
        agent.queue = plan.into_steps().into();

        // The world moved on: the queued step is no longer affordable.
        agent.set("cash", 0.0);
        assert_eq!(
            agent.step(),
            StepReport::Executed {
                choice: "earn".to_string(),
                replans: 1
            }
        );
        assert_eq!(agent.state().num("cash"), Some(10.0));
        assert!(agent.goals().contains("shop"));
    }

    #[test]
    fn test_replan_budget() {
        let mut agent = agent(0.0, vec![hire_help()], Some(1));
        agent.queue.push_back(PlanStep::new(
            Choice::Action(hire_help()),
            Node::new(State::new(), GoalSet::new()),
        ));

        assert_eq!(agent.step(), StepReport::Idle { replans: 1 });
        assert!(agent.diary().is_empty());
    }

    #[test]
    fn test_cooldown() {
        let commute = Arc::new(
            Action::builder("commute")
                .outcome(Update::new().delta("cash", 1.0), 1.0)
                .duration(3)
                .build()
                .unwrap(),
        );
        let mut agent = agent(0.0, vec![commute], Some(2));

        assert!(matches!(agent.step(), StepReport::Executed { .. }));
        assert_eq!(agent.step(), StepReport::Busy { remaining: 1 });
        assert_eq!(agent.step(), StepReport::Busy { remaining: 0 });
        assert!(matches!(agent.step(), StepReport::Executed { .. }));
        assert_eq!(agent.diary().len(), 2);
    }

    #[test]
    fn test_goal_fulfilled_on_execution() {
        let mut agent = agent(250.0, vec![work()], Some(1));

        assert_eq!(
            agent.step(),
            StepReport::Executed {
                choice: "money".to_string(),
                replans: 0
            }
        );
        assert_eq!(agent.state().num("cash"), Some(1250.0));
        assert!(agent.goals().is_empty());
    }

    #[test]
    fn test_advance_goals() {
        let rent = Goal::builder("pay rent")
            .prereq("cash", Prereq::ge(500))
            .outcome(Update::new().delta("cash", -500.0), 1.0)
            .failure(Update::new().delta("stress", 1.0), 1.0)
            .time(2)
            .repeats(true)
            .build()
            .unwrap();
        let mut agent = agent(0.0, vec![work()], Some(1));
        agent.add_goal(rent);

        assert!(agent.advance_goals(1).is_empty());
        assert_eq!(agent.goals().get("pay rent").and_then(|g| g.time()), Some(1));

        let expired = agent.advance_goals(1);
        assert_eq!(
            expired,
            vec![GoalExpiry {
                goal: "pay rent".to_string(),
                renewed: true
            }]
        );
        assert_eq!(agent.state().num("stress"), Some(1.0));
        assert_eq!(agent.goals().get("pay rent").and_then(|g| g.time()), Some(2));
        assert!(agent.goals().contains("money"));
    }

    #[test]
    fn test_seeded_agents_reproducible() {
        let run = || {
            let mut agent = agent(0.0, vec![work(), hire_help()], Some(3));
            for _ in 0..6 {
                agent.step();
            }
            (agent.state(), agent.diary().to_vec())
        };

        assert_eq!(run(), run());
    }
}
