//! Feature vectors and mental-state estimates

use crate::error::CastResult;
use serde::{Deserialize, Serialize};

/// How the feature vector is assembled from a band-power summary.
///
/// The composition is configuration, not a fixed property of the pipeline.
/// `MeanDuplicated` reproduces the legacy variant that concatenates the mean
/// vector with itself; it is kept selectable rather than hard-wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureComposition {
    /// Per-band means only
    MeanOnly,
    /// Per-band means followed by per-band standard deviations
    MeanStd,
    /// Per-band means concatenated with themselves
    MeanDuplicated,
}

impl Default for FeatureComposition {
    fn default() -> Self {
        FeatureComposition::MeanStd
    }
}

/// Fixed-order numeric summary fed to inference models.
///
/// Length is fixed for the lifetime of a session: it depends only on the
/// canonical band count and the configured composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        FeatureVector { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Score for one named mental state at one tick.
///
/// `Unavailable` marks a model failure for this tick; last known values are
/// never silently reused, so consumers can always tell fresh from stale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StateScore {
    /// Value produced by the model this tick, clamped to [0, 1]
    Fresh(f32),
    /// The model failed or returned a non-numeric result this tick
    Unavailable,
}

impl StateScore {
    pub fn value(&self) -> Option<f32> {
        match self {
            StateScore::Fresh(v) => Some(*v),
            StateScore::Unavailable => None,
        }
    }
}

/// Named mental-state scores produced once per tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentalStateEstimate {
    scores: Vec<(String, StateScore)>,
}

impl MentalStateEstimate {
    pub fn new() -> Self {
        MentalStateEstimate { scores: Vec::new() }
    }

    pub fn set(&mut self, state: &str, score: StateScore) {
        self.scores.push((state.to_string(), score));
    }

    pub fn get(&self, state: &str) -> Option<StateScore> {
        self.scores
            .iter()
            .find(|(name, _)| name == state)
            .map(|(_, score)| *score)
    }

    /// All scores in insertion order
    pub fn scores(&self) -> &[(String, StateScore)] {
        &self.scores
    }

    /// Fresh (state, value) pairs only
    pub fn fresh_values(&self) -> impl Iterator<Item = (&str, f32)> {
        self.scores.iter().filter_map(|(name, score)| {
            score.value().map(|v| (name.as_str(), v))
        })
    }
}

impl Default for MentalStateEstimate {
    fn default() -> Self {
        Self::new()
    }
}

/// External inference model for one named mental state.
///
/// Models are opaque, already-trained and stateful: `prepare` is called once
/// before first use (expensive resource loading), `predict` once per tick
/// and must be idempotent for identical input, `release` exactly once at
/// shutdown. Scores outside [0, 1] are tolerated by callers, never fatal.
pub trait StateModel: Send {
    /// Name of the mental state this model estimates
    fn state_name(&self) -> &str;

    /// Load model resources; called once before the first `predict`
    fn prepare(&mut self) -> CastResult<()>;

    /// Estimate the state score for one feature vector
    fn predict(&mut self, features: &FeatureVector) -> CastResult<f32>;

    /// Free model resources; called exactly once at shutdown
    fn release(&mut self) -> CastResult<()>;
}
