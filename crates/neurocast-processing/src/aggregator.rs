//! Feature-vector assembly and rolling feature history

use neurocast_core::{
    BandPowerSummary, CastError, CastResult, FeatureComposition, FeatureVector,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// How the feature vector is assembled from the band-power summary
    pub composition: FeatureComposition,
    /// Maximum retained feature vectors; oldest evicted first
    pub history_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            composition: FeatureComposition::default(),
            history_capacity: 80,
        }
    }
}

/// Turns band-power summaries into fixed-length feature vectors and keeps a
/// bounded rolling history of them.
///
/// Feature length depends only on the band count and the configured
/// composition, so it is constant for the lifetime of a session.
pub struct FeatureAggregator {
    config: AggregatorConfig,
    history: VecDeque<FeatureVector>,
}

impl FeatureAggregator {
    pub fn new(config: AggregatorConfig) -> CastResult<Self> {
        if config.history_capacity == 0 {
            return Err(CastError::ConfigurationError {
                message: "Feature history capacity must be at least 1".to_string(),
            });
        }
        Ok(FeatureAggregator {
            config,
            history: VecDeque::with_capacity(config.history_capacity),
        })
    }

    /// Assemble the feature vector for one tick; history is untouched
    pub fn build(&self, summary: &BandPowerSummary) -> FeatureVector {
        let mut values = Vec::with_capacity(summary.means.len() * 2);
        values.extend_from_slice(&summary.means);
        match self.config.composition {
            FeatureComposition::MeanOnly => {}
            FeatureComposition::MeanStd => values.extend_from_slice(&summary.std_devs),
            FeatureComposition::MeanDuplicated => values.extend_from_slice(&summary.means),
        }
        FeatureVector::new(values)
    }

    /// Retain one feature vector, evicting the oldest at capacity
    pub fn push_history(&mut self, features: FeatureVector) {
        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(features);
    }

    /// Retained feature vectors, oldest first
    pub fn history(&self) -> impl Iterator<Item = &FeatureVector> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn composition(&self) -> FeatureComposition {
        self.config.composition
    }
}
