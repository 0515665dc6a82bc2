//! Daily-routine demo domain: agents balance stress, fatigue and cash over
//! a 24-hour day while a weekly rent bill looms.

use std::sync::Arc;

use chrono::NaiveDate;
use praxis_core::{
    Action, AttributeType, Constraint, Constraints, Goal, Node, Prereq, Result, State, Update,
};
use praxis_planner::{PlannerConfig, Successors, UtilityPlanner, UtilityTable};
use rand::{Rng, RngCore};

pub const HOURS_IN_DAY: u32 = 24;

/// Ticks before the rent is due.
pub const RENT_PERIOD: u32 = 2 * HOURS_IN_DAY;

pub fn start_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2005, 1, 1)
}

/// Sample Beta(a, b) for integer shape parameters: the a-th smallest of
/// a + b - 1 uniforms. Both shapes must be at least 1.
fn beta(rng: &mut dyn RngCore, a: usize, b: usize) -> f64 {
    debug_assert!(a >= 1 && b >= 1, "beta shapes must be positive, got ({a}, {b})");
    let mut draws: Vec<f64> = (0..a + b - 1).map(|_| rng.gen::<f64>()).collect();
    draws.sort_by(f64::total_cmp);
    draws[a - 1]
}

fn beta_mean(a: usize, b: usize) -> f64 {
    a as f64 / (a + b) as f64
}

/// `scale * Beta(a, b)` as an expected/sampled delta pair.
fn scaled_beta(update: Update, key: &str, scale: f64, a: usize, b: usize) -> Update {
    update.dynamic(
        key,
        move |_: &State| scale * beta_mean(a, b),
        move |_: &State, rng: &mut dyn RngCore| scale * beta(rng, a, b),
    )
}

/// Utility of a wellbeing attribute: flat while low, exponentially bad above one.
fn wellbeing(x: f64) -> f64 {
    if x > 1.0 {
        -(2f64.powf(x))
    } else {
        0.5 * (-x + 1.0 + 1e12).ln() + 0.1
    }
}

/// Utility of cash: linear in debt, saturating sigmoid when positive.
fn cash(x: f64) -> f64 {
    if x <= 0.0 {
        x - 1.0
    } else {
        10_000.0 / (1.0 + (-x).exp()) - 5_000.0
    }
}

pub fn utilities() -> UtilityTable {
    UtilityTable::new()
        .with_numeric("stress", wellbeing)
        .with_numeric("fatigue", wellbeing)
        .with_numeric("cash", cash)
        .with_numeric("employed", |x| if x == 1.0 { 10_000.0 } else { -10_000.0 })
}

pub fn constraints() -> Constraints {
    Constraints::new()
        .with("stress", Constraint::range(Some(0.0), Some(10.0)))
        .with("fatigue", Constraint::range(Some(0.0), Some(10.0)))
        .with("hour", Constraint::range(Some(0.0), Some(f64::from(HOURS_IN_DAY))))
        .with("employed", Constraint::typed(AttributeType::Bool))
}

pub fn initial_state() -> State {
    [
        ("stress", praxis_core::Value::from(0.5)),
        ("fatigue", praxis_core::Value::from(0.5)),
        ("cash", praxis_core::Value::from(150.0)),
        ("employed", praxis_core::Value::from(false)),
        ("hour", praxis_core::Value::from(0.0)),
    ]
    .into_iter()
    .collect()
}

fn hours(update: Update, duration: u32) -> Update {
    update.delta("hour", f64::from(duration))
}

pub fn actions() -> Result<Vec<Arc<Action>>> {
    let relax = Action::builder("relax")
        .prereq("cash", Prereq::ge(100))
        .outcome(
            hours(
                scaled_beta(scaled_beta(Update::new(), "stress", -1.0, 2, 10), "cash", -100.0, 2, 10),
                2,
            ),
            0.8,
        )
        .outcome(hours(scaled_beta(Update::new(), "stress", -1.0, 2, 6), 2), 0.1)
        .outcome(hours(scaled_beta(Update::new(), "stress", 1.0, 1, 10), 2), 0.1)
        .duration(2)
        .build()?;

    let work = Action::builder("work")
        .prereq("employed", Prereq::eq(true))
        .prereq("hour", Prereq::ge(6) & Prereq::le(18))
        .outcome(
            hours(
                scaled_beta(Update::new(), "stress", 1.0, 1, 10)
                    .delta("cash", 100.0)
                    .delta("fatigue", 0.5),
                4,
            ),
            0.8,
        )
        .outcome(
            hours(
                scaled_beta(Update::new(), "stress", 1.0, 1, 8)
                    .delta("cash", 100.0)
                    .delta("fatigue", 0.6),
                4,
            ),
            0.2,
        )
        .duration(4)
        .build()?;

    let sleep = Action::builder("sleep")
        .outcome(
            hours(
                scaled_beta(Update::new(), "stress", -1.0, 2, 6).delta("fatigue", -1.0),
                6,
            ),
            1.0,
        )
        .duration(6)
        .build()?;

    let look_for_work = Action::builder("look for work")
        .prereq("employed", Prereq::eq(false))
        .outcome(hours(Update::new().delta("stress", 0.5), 4), 0.8)
        .outcome(
            hours(Update::new().delta("stress", 0.5).delta("employed", true), 4),
            0.2,
        )
        .duration(4)
        .build()?;

    Ok(vec![relax, work, sleep, look_for_work]
        .into_iter()
        .map(Arc::new)
        .collect())
}

pub fn pay_rent() -> Result<Goal> {
    Goal::builder("pay rent")
        .prereq("cash", Prereq::ge(500))
        .outcome(Update::new().delta("cash", -500.0).delta("stress", -0.5), 1.0)
        .failure(Update::new().delta("stress", 2.0), 1.0)
        .time(RENT_PERIOD)
        .repeats(true)
        .build()
}

/// Admit only actions that finish before the day ends.
pub fn fits_in_day(state: &State, action: &Action) -> bool {
    let hour = state.num("hour").unwrap_or(0.0);
    hour + f64::from(action.duration()) <= f64::from(HOURS_IN_DAY)
}

/// A plan is complete once it fills the day.
pub fn end_of_day(node: &Node) -> bool {
    node.state.num("hour").unwrap_or(0.0) >= f64::from(HOURS_IN_DAY)
}

pub fn planner(constraints: Constraints, config: PlannerConfig) -> Result<UtilityPlanner> {
    config.validate()?;
    let successors = Successors::new(actions()?, utilities())
        .with_constraints(constraints)
        .with_filter(fits_in_day);
    Ok(UtilityPlanner::with_config(successors, config))
}
