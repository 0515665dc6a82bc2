//! Stochastic outcomes of actions and goals.
//!
//! An [`Outcomes`] set pairs a list of [`Update`]s with a [`Distribution`]
//! over them. It can be sampled ([`Outcomes::resolve`]), enumerated with
//! probabilities ([`Outcomes::enumerate`], [`Outcomes::states`]), or collapsed
//! into a single expected state ([`Outcomes::expected_state`]) for lookahead.
//! None of these operations mutate the input state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rand::distributions::{Distribution as _, WeightedIndex};
use rand::RngCore;
use tracing::{trace, warn};

use crate::error::{PraxisError, Result};
use crate::state::State;
use crate::types::Value;

/// Slack allowed when checking that probabilities sum to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Expected change of an attribute given the predecessor state.
pub type ExpectedFn = Arc<dyn Fn(&State) -> f64 + Send + Sync>;

/// Sampled change of an attribute given the predecessor state.
pub type SampleFn = Arc<dyn Fn(&State, &mut dyn RngCore) -> f64 + Send + Sync>;

/// State patch applied only when an outcome is actually realised.
pub type ResolveFn = Arc<dyn Fn(&State, &mut dyn RngCore) -> State + Send + Sync>;

/// Probabilities computed from the current state.
pub type DistributionFn = Arc<dyn Fn(&State) -> Vec<f64> + Send + Sync>;

/// Change applied to one attribute.
#[derive(Clone)]
pub enum Delta {
    /// Add a constant to a numeric attribute.
    Constant(f64),
    /// Replace the attribute value. The only way to change booleans and enums.
    Set(Value),
    /// A state-dependent numeric change, as a `(sampled, expected)` pair of
    /// functions. Lookahead uses `expected`; resolution draws from `sample`.
    Dynamic {
        expected: ExpectedFn,
        sample: SampleFn,
    },
}

impl Delta {
    /// Build a dynamic delta.
    pub fn dynamic<E, S>(expected: E, sample: S) -> Self
    where
        E: Fn(&State) -> f64 + Send + Sync + 'static,
        S: Fn(&State, &mut dyn RngCore) -> f64 + Send + Sync + 'static,
    {
        Delta::Dynamic {
            expected: Arc::new(expected),
            sample: Arc::new(sample),
        }
    }

    fn expected(&self, key: &str, current: &Value, state: &State) -> Value {
        match self {
            Delta::Constant(d) => shift(key, current, *d),
            Delta::Set(v) => v.clone(),
            Delta::Dynamic { expected, .. } => shift(key, current, expected(state)),
        }
    }

    fn sampled(&self, key: &str, current: &Value, state: &State, rng: &mut dyn RngCore) -> Value {
        match self {
            Delta::Dynamic { sample, .. } => shift(key, current, sample(state, rng)),
            _ => self.expected(key, current, state),
        }
    }
}

fn shift(key: &str, current: &Value, delta: f64) -> Value {
    match current {
        Value::Num(x) => Value::Num(x + delta),
        other => {
            trace!("Ignoring numeric delta on non-numeric attribute {}", key);
            other.clone()
        }
    }
}

impl fmt::Debug for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delta::Constant(d) => f.debug_tuple("Constant").field(d).finish(),
            Delta::Set(v) => f.debug_tuple("Set").field(v).finish(),
            Delta::Dynamic { .. } => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<f64> for Delta {
    fn from(d: f64) -> Self {
        Delta::Constant(d)
    }
}

impl From<i32> for Delta {
    fn from(d: i32) -> Self {
        Delta::Constant(f64::from(d))
    }
}

impl From<bool> for Delta {
    fn from(b: bool) -> Self {
        Delta::Set(Value::Bool(b))
    }
}

impl From<&str> for Delta {
    fn from(s: &str) -> Self {
        Delta::Set(Value::from(s))
    }
}

/// One possible outcome: a set of attribute deltas plus an optional
/// resolution-only state function.
#[derive(Clone, Default)]
pub struct Update {
    deltas: BTreeMap<String, Delta>,
    on_resolve: Option<ResolveFn>,
}

static NO_EFFECT: Update = Update {
    deltas: BTreeMap::new(),
    on_resolve: None,
};

impl Update {
    /// An update with no effect.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a delta for an attribute.
    pub fn delta(mut self, key: impl Into<String>, delta: impl Into<Delta>) -> Self {
        self.deltas.insert(key.into(), delta.into());
        self
    }

    /// Add a dynamic delta for an attribute.
    pub fn dynamic<E, S>(self, key: impl Into<String>, expected: E, sample: S) -> Self
    where
        E: Fn(&State) -> f64 + Send + Sync + 'static,
        S: Fn(&State, &mut dyn RngCore) -> f64 + Send + Sync + 'static,
    {
        self.delta(key, Delta::dynamic(expected, sample))
    }

    /// Attach a function run only when this outcome is realised. It receives
    /// the already-updated state and its result is merged over it; it may
    /// introduce new attributes.
    pub fn on_resolve<F>(mut self, f: F) -> Self
    where
        F: Fn(&State, &mut dyn RngCore) -> State + Send + Sync + 'static,
    {
        self.on_resolve = Some(Arc::new(f));
        self
    }

    /// Deltas keyed by attribute.
    pub fn deltas(&self) -> impl Iterator<Item = (&str, &Delta)> {
        self.deltas.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Returns true if this update changes nothing.
    pub fn is_no_effect(&self) -> bool {
        self.deltas.is_empty() && self.on_resolve.is_none()
    }

    /// Apply expected deltas. Attributes absent from `state` are ignored and
    /// the resolution-only function is never run.
    pub fn expected_state(&self, state: &State) -> State {
        self.apply(state, |key, delta, current| delta.expected(key, current, state))
    }

    /// Apply sampled deltas, then the resolution-only function if present.
    pub fn resolve(&self, state: &State, rng: &mut dyn RngCore) -> State {
        let next = self.apply(state, |key, delta, current| {
            delta.sampled(key, current, state, &mut *rng)
        });
        match &self.on_resolve {
            Some(f) => {
                let patch = f(&next, rng);
                next.merge(&patch)
            }
            None => next,
        }
    }

    fn apply<F>(&self, state: &State, mut realize: F) -> State
    where
        F: FnMut(&str, &Delta, &Value) -> Value,
    {
        let mut next = state.clone();
        for (key, delta) in &self.deltas {
            let Some(current) = state.get(key) else {
                continue;
            };
            next.insert(key.clone(), realize(key, delta, current));
        }
        next
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update")
            .field("deltas", &self.deltas)
            .field("on_resolve", &self.on_resolve.is_some())
            .finish()
    }
}

impl<K: Into<String>, D: Into<Delta>> FromIterator<(K, D)> for Update {
    fn from_iter<I: IntoIterator<Item = (K, D)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Update::new(), |acc, (k, d)| acc.delta(k, d))
    }
}

/// Probabilities over the updates of an outcome set.
#[derive(Clone)]
pub enum Distribution {
    /// A fixed list, validated at construction.
    Fixed(Vec<f64>),
    /// A function of the current state, validated when realised.
    Dynamic(DistributionFn),
}

impl fmt::Debug for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Fixed(p) => f.debug_tuple("Fixed").field(p).finish(),
            Distribution::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A list of updates with a distribution over them.
#[derive(Clone, Debug)]
pub struct Outcomes {
    updates: Vec<Update>,
    dist: Distribution,
}

impl Outcomes {
    /// Create an outcome set, validating fixed distributions.
    pub fn new(updates: Vec<Update>, dist: Distribution) -> Result<Self> {
        if let Distribution::Fixed(probs) = &dist {
            validate_fixed(updates.len(), probs)?;
        }
        Ok(Self { updates, dist })
    }

    /// Create an outcome set with a fixed distribution.
    pub fn fixed(updates: Vec<Update>, probs: Vec<f64>) -> Result<Self> {
        Self::new(updates, Distribution::Fixed(probs))
    }

    /// Create an outcome set whose distribution depends on the state.
    pub fn dynamic<F>(updates: Vec<Update>, f: F) -> Self
    where
        F: Fn(&State) -> Vec<f64> + Send + Sync + 'static,
    {
        Self {
            updates,
            dist: Distribution::Dynamic(Arc::new(f)),
        }
    }

    /// A single update that always happens.
    pub fn certain(update: Update) -> Self {
        Self {
            updates: vec![update],
            dist: Distribution::Fixed(vec![1.0]),
        }
    }

    /// An outcome set with no effect.
    pub fn none() -> Self {
        Self {
            updates: Vec::new(),
            dist: Distribution::Fixed(Vec::new()),
        }
    }

    /// The declared updates, without padding.
    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    /// Realise the distribution for `state` and pair it with the updates.
    ///
    /// If the probabilities sum to less than one, a no-effect update carrying
    /// the residual mass is appended.
    pub fn enumerate(&self, state: &State) -> Vec<(&Update, f64)> {
        let probs = match &self.dist {
            Distribution::Fixed(p) => p.clone(),
            Distribution::Dynamic(f) => sanitize_dynamic(f(state), self.updates.len()),
        };

        let mut entries: Vec<(&Update, f64)> = self.updates.iter().zip(probs).collect();
        let mass: f64 = entries.iter().map(|(_, p)| p).sum();
        if mass < 1.0 - PROBABILITY_TOLERANCE {
            entries.push((&NO_EFFECT, 1.0 - mass));
        }
        entries
    }

    /// Draw one outcome and apply it to `state`.
    pub fn resolve(&self, state: &State, rng: &mut dyn RngCore) -> State {
        let entries = self.enumerate(state);
        let index = match WeightedIndex::new(entries.iter().map(|(_, p)| *p)) {
            Ok(index) => index,
            Err(err) => {
                warn!("Cannot sample outcome ({}); leaving state unchanged", err);
                return state.clone();
            }
        };
        let (update, _) = entries[index.sample(&mut *rng)];
        update.resolve(state, rng)
    }

    /// Every expected outcome state with its probability.
    pub fn states(&self, state: &State) -> Vec<(State, f64)> {
        self.enumerate(state)
            .into_iter()
            .map(|(update, p)| (update.expected_state(state), p))
            .collect()
    }

    /// Probability-weighted expected state.
    ///
    /// Numeric attributes take the weighted mean across outcomes. Any other
    /// attribute takes the value carrying the greatest total probability.
    pub fn expected_state(&self, state: &State) -> State {
        let candidates = self.states(state);
        let keys: BTreeSet<&str> = candidates.iter().flat_map(|(s, _)| s.keys()).collect();

        let mut expected = State::new();
        for key in keys {
            let values: Vec<(&Value, f64)> = candidates
                .iter()
                .filter_map(|(s, p)| s.get(key).map(|v| (v, *p)))
                .collect();

            if values.iter().all(|(v, _)| v.is_numeric()) {
                let mean: f64 = values
                    .iter()
                    .map(|(v, p)| p * v.to_f64_lossy())
                    .sum();
                expected.insert(key, mean);
            } else if let Some(mode) = mode(&values) {
                expected.insert(key, mode.clone());
            }
        }
        expected
    }
}

/// Value with the greatest total probability; the earliest wins ties.
fn mode<'a>(values: &[(&'a Value, f64)]) -> Option<&'a Value> {
    let mut masses: Vec<(&Value, f64)> = Vec::new();
    for (v, p) in values {
        match masses.iter().position(|(seen, _)| *seen == *v) {
            Some(i) => masses[i].1 += p,
            None => masses.push((*v, *p)),
        }
    }

    let mut best: Option<(&Value, f64)> = None;
    for (v, mass) in masses {
        if best.map_or(true, |(_, m)| mass > m) {
            best = Some((v, mass));
        }
    }
    best.map(|(v, _)| v)
}

fn validate_fixed(n_updates: usize, probs: &[f64]) -> Result<()> {
    if probs.len() != n_updates {
        return Err(PraxisError::malformed(format!(
            "{} updates but {} probabilities",
            n_updates,
            probs.len()
        )));
    }
    if let Some(p) = probs.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(PraxisError::malformed(format!("invalid probability {}", p)));
    }
    let mass: f64 = probs.iter().sum();
    if mass > 1.0 + PROBABILITY_TOLERANCE {
        return Err(PraxisError::malformed(format!(
            "probabilities sum to {}",
            mass
        )));
    }
    Ok(())
}

fn sanitize_dynamic(mut probs: Vec<f64>, n_updates: usize) -> Vec<f64> {
    if probs.len() != n_updates {
        warn!(
            "Dynamic distribution returned {} probabilities for {} updates",
            probs.len(),
            n_updates
        );
        probs.resize(n_updates, 0.0);
    }
    for p in probs.iter_mut() {
        if !p.is_finite() || *p < 0.0 {
            warn!("Dynamic distribution returned invalid probability {}", p);
            *p = 0.0;
        }
    }
    let mass: f64 = probs.iter().sum();
    if mass > 1.0 + PROBABILITY_TOLERANCE {
        warn!("Dynamic distribution sums to {}; renormalising", mass);
        for p in probs.iter_mut() {
            *p /= mass;
        }
    }
    probs
}
