//! Neurocast-Processing: the real-time feature extraction pipeline
//!
//! Per-channel signal conditioning, Welch spectral analysis with band-power
//! integration, and feature-vector aggregation with rolling history.

pub mod aggregator;
pub mod conditioner;
pub mod spectral;

pub use aggregator::{AggregatorConfig, FeatureAggregator};
pub use conditioner::{ChainConfig, ConditionerConfig, DetrendMode, FilterStage, SignalConditioner};
pub use spectral::{SpectralAnalyzer, SpectralConfig};
