//! Mental-state classification over feature vectors

use neurocast_core::{
    CastError, CastResult, FeatureVector, FrequencyBand, MentalStateEstimate, StateModel,
    StateScore,
};
use tracing::warn;

/// Band-power-ratio model over the canonical band means.
///
/// Scores one state as the ratio of a numerator band set to a denominator
/// band set, reading the per-band means at the front of the feature vector.
pub struct BandRatioModel {
    name: String,
    numerator: Vec<usize>,
    denominator: Vec<usize>,
    prepared: bool,
}

impl BandRatioModel {
    /// alpha / (alpha + beta): high when alpha dominates
    pub fn relaxation() -> CastResult<Self> {
        Self::new("relaxation", &["alpha"], &["alpha", "beta"])
    }

    /// beta / (theta + alpha + beta): high when beta dominates
    pub fn concentration() -> CastResult<Self> {
        Self::new("concentration", &["beta"], &["theta", "alpha", "beta"])
    }

    pub fn new(name: &str, numerator: &[&str], denominator: &[&str]) -> CastResult<Self> {
        let bands = FrequencyBand::summary_bands();
        let resolve = |names: &[&str]| -> CastResult<Vec<usize>> {
            names
                .iter()
                .map(|n| {
                    bands
                        .iter()
                        .position(|b| b.name == *n)
                        .ok_or_else(|| CastError::ModelError {
                            model: name.to_string(),
                            message: format!("Unknown band '{}'", n),
                        })
                })
                .collect()
        };

        Ok(BandRatioModel {
            name: name.to_string(),
            numerator: resolve(numerator)?,
            denominator: resolve(denominator)?,
            prepared: false,
        })
    }
}

impl StateModel for BandRatioModel {
    fn state_name(&self) -> &str {
        &self.name
    }

    fn prepare(&mut self) -> CastResult<()> {
        self.prepared = true;
        Ok(())
    }

    fn predict(&mut self, features: &FeatureVector) -> CastResult<f32> {
        if !self.prepared {
            return Err(CastError::ModelError {
                model: self.name.clone(),
                message: "Predict called before prepare".to_string(),
            });
        }
        let band_count = FrequencyBand::summary_bands().len();
        if features.len() < band_count {
            return Err(CastError::ModelError {
                model: self.name.clone(),
                message: format!(
                    "Feature vector of {} values is shorter than {} band means",
                    features.len(),
                    band_count
                ),
            });
        }

        let means = &features.values()[..band_count];
        let num: f32 = self.numerator.iter().map(|&i| means[i]).sum();
        let den: f32 = self.denominator.iter().map(|&i| means[i]).sum();
        if den <= f32::EPSILON {
            return Err(CastError::ModelError {
                model: self.name.clone(),
                message: "Degenerate band powers, no spectral content".to_string(),
            });
        }
        Ok(num / den)
    }

    fn release(&mut self) -> CastResult<()> {
        self.prepared = false;
        Ok(())
    }
}

/// Owns the model set and enforces the prepare/predict/release lifecycle.
///
/// `release_all` is idempotent at this level so shutdown paths can call it
/// without tracking whether a run ever started; each underlying model still
/// sees exactly one `release`.
pub struct StateClassifier {
    models: Vec<Box<dyn StateModel>>,
    prepared: bool,
    released: bool,
}

impl StateClassifier {
    pub fn new(models: Vec<Box<dyn StateModel>>) -> Self {
        StateClassifier {
            models,
            prepared: false,
            released: false,
        }
    }

    pub fn state_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.state_name()).collect()
    }

    /// Prepare every model; called once before the first tick
    pub fn prepare_all(&mut self) -> CastResult<()> {
        for model in self.models.iter_mut() {
            model.prepare()?;
        }
        self.prepared = true;
        Ok(())
    }

    /// Score every model for one tick.
    ///
    /// A failing model yields `Unavailable` for its state and never aborts
    /// the tick; scores outside [0, 1] are clamped.
    pub fn predict_all(&mut self, features: &FeatureVector) -> MentalStateEstimate {
        let mut estimate = MentalStateEstimate::new();
        for model in self.models.iter_mut() {
            let score = match model.predict(features) {
                Ok(v) if v.is_finite() => StateScore::Fresh(v.clamp(0.0, 1.0)),
                Ok(v) => {
                    warn!(model = model.state_name(), value = v, "Model returned a non-finite score");
                    StateScore::Unavailable
                }
                Err(e) => {
                    warn!(model = model.state_name(), error = %e, "Model prediction failed");
                    StateScore::Unavailable
                }
            };
            estimate.set(model.state_name(), score);
        }
        estimate
    }

    /// Release every prepared model, at most once
    pub fn release_all(&mut self) {
        if self.released || !self.prepared {
            return;
        }
        self.released = true;
        for model in self.models.iter_mut() {
            if let Err(e) = model.release() {
                warn!(model = model.state_name(), error = %e, "Model release failed");
            }
        }
    }
}
