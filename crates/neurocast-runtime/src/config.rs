//! Runtime configuration, loadable from JSON

use neurocast_core::{CastError, CastResult, FeatureComposition};
use neurocast_processing::{ConditionerConfig, SpectralConfig};
use serde::{Deserialize, Serialize};

/// Top-level pipeline configuration.
///
/// Everything here is fixed for the lifetime of a session; changing any of
/// it means stopping the scheduler and starting a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Analysis window length in seconds
    pub window_secs: f32,
    /// Tick interval in milliseconds
    pub tick_interval_ms: u64,
    /// Fractional digits for dispatched values
    pub precision: usize,
    /// UDP endpoint for the always-on OSC control stream
    pub osc_target: String,
    /// OSC address pattern
    pub osc_address: String,
    /// Optional UDP endpoint for the deduplicated JSON batch stream
    pub batch_target: Option<String>,
    /// Also dispatch per-band mean powers alongside state scores
    pub dispatch_band_means: bool,
    /// Feature vector composition
    pub composition: FeatureComposition,
    /// Per-kind filter chains
    pub conditioner: ConditionerConfig,
    /// Welch estimator and band boundary tables
    pub spectral: SpectralConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            window_secs: 4.0,
            tick_interval_ms: 50,
            precision: 2,
            osc_target: "127.0.0.1:6010".to_string(),
            osc_address: "/ctrl".to_string(),
            batch_target: None,
            dispatch_band_means: false,
            composition: FeatureComposition::default(),
            conditioner: ConditionerConfig::default(),
            spectral: SpectralConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> CastResult<()> {
        if self.window_secs <= 0.0 {
            return Err(CastError::ConfigurationError {
                message: format!("Window length must be positive, got {}s", self.window_secs),
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(CastError::ConfigurationError {
                message: "Tick interval must be at least 1ms".to_string(),
            });
        }
        Ok(())
    }

    /// Feature history capacity covering one window's worth of ticks
    pub fn history_capacity(&self) -> usize {
        ((self.window_secs * 1000.0 / self.tick_interval_ms as f32).ceil() as usize).max(1)
    }

    pub fn from_json(json: &str) -> CastResult<Self> {
        let config: RuntimeConfig =
            serde_json::from_str(json).map_err(|e| CastError::ConfigurationError {
                message: format!("Failed to parse configuration: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> CastResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CastError::ConfigurationError {
            message: format!("Failed to serialize configuration: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_history_covers_one_window() {
        let config = RuntimeConfig::default();
        // 4s window at 50ms ticks
        assert_eq!(config.history_capacity(), 80);
    }

    #[test]
    fn test_json_round_trip() {
        let config = RuntimeConfig::default();
        let json = config.to_json().unwrap();
        let parsed = RuntimeConfig::from_json(&json).unwrap();
        assert_eq!(parsed.window_secs, 4.0);
        assert_eq!(parsed.osc_target, "127.0.0.1:6010");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed = RuntimeConfig::from_json(r#"{"tick_interval_ms": 100}"#).unwrap();
        assert_eq!(parsed.tick_interval_ms, 100);
        assert_eq!(parsed.window_secs, 4.0);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let result = RuntimeConfig::from_json(r#"{"window_secs": 0.0}"#);
        assert!(matches!(result, Err(CastError::ConfigurationError { .. })));
    }
}
