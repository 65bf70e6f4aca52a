//! Frequency bands, power spectral density and integrated band powers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named frequency range in Hz, half-open `[low, high)`.
///
/// Bands may overlap (alpha/mu, beta/smr); downstream consumers use
/// different subsets, so ranges stay independent by design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    pub low_freq: f32,
    pub high_freq: f32,
}

impl FrequencyBand {
    pub fn new(name: &str, low_freq: f32, high_freq: f32) -> Self {
        FrequencyBand {
            name: name.to_string(),
            low_freq,
            high_freq,
        }
    }

    /// Full EEG band table used for per-channel band powers
    pub fn eeg_bands() -> Vec<FrequencyBand> {
        vec![
            FrequencyBand::new("delta", 1.0, 3.0),
            FrequencyBand::new("theta", 4.0, 7.0),
            FrequencyBand::new("mu", 7.5, 12.5),
            FrequencyBand::new("smr", 12.5, 15.5),
            FrequencyBand::new("alpha", 8.0, 12.0),
            FrequencyBand::new("beta", 12.0, 30.0),
            FrequencyBand::new("gamma", 32.0, 59.0),
        ]
    }

    /// Canonical feature-generating subset, in stable order
    pub fn summary_bands() -> Vec<FrequencyBand> {
        vec![
            FrequencyBand::new("delta", 1.0, 3.0),
            FrequencyBand::new("theta", 4.0, 7.0),
            FrequencyBand::new("alpha", 8.0, 12.0),
            FrequencyBand::new("beta", 12.0, 30.0),
            FrequencyBand::new("gamma", 32.0, 59.0),
        ]
    }
}

/// Power spectral density for one channel: frequency bins paired with power
/// values. Recomputed every tick, never persisted.
#[derive(Debug, Clone)]
pub struct Psd {
    /// Bin center frequencies in Hz, ascending
    pub frequencies: Vec<f32>,
    /// Power value per bin
    pub powers: Vec<f32>,
}

impl Psd {
    /// Integrate power over `[low, high)` by rectangular summation.
    ///
    /// Each contributing bin adds `power * bin_width`; a flat spectrum
    /// therefore yields a value monotonic in band width.
    pub fn band_power(&self, low: f32, high: f32) -> f32 {
        if self.frequencies.len() < 2 {
            return 0.0;
        }
        let df = self.frequencies[1] - self.frequencies[0];
        self.frequencies
            .iter()
            .zip(self.powers.iter())
            .filter(|(&f, _)| f >= low && f < high)
            .map(|(_, &p)| p * df)
            .sum()
    }

    /// Integrate power over a named band
    pub fn band_power_of(&self, band: &FrequencyBand) -> f32 {
        self.band_power(band.low_freq, band.high_freq)
    }
}

/// Integrated band powers for one channel at one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandPowers {
    powers: HashMap<String, f32>,
}

impl BandPowers {
    pub fn new() -> Self {
        BandPowers {
            powers: HashMap::new(),
        }
    }

    /// Zero power for every band in `bands`
    pub fn zeros(bands: &[FrequencyBand]) -> Self {
        let powers = bands.iter().map(|b| (b.name.clone(), 0.0)).collect();
        BandPowers { powers }
    }

    pub fn set(&mut self, band: &str, power: f32) {
        self.powers.insert(band.to_string(), power);
    }

    pub fn get(&self, band: &str) -> Option<f32> {
        self.powers.get(band).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }
}

impl Default for BandPowers {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean and standard deviation of each canonical band's power across all
/// EEG channels. This is the feature-generating summary consumed by the
/// aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandPowerSummary {
    /// Band names in canonical order
    pub bands: Vec<String>,
    /// Mean power per band, canonical order
    pub means: Vec<f32>,
    /// Population standard deviation per band, canonical order
    pub std_devs: Vec<f32>,
}

impl BandPowerSummary {
    /// Mean power for one band by name
    pub fn mean_of(&self, band: &str) -> Option<f32> {
        self.bands
            .iter()
            .position(|b| b == band)
            .map(|i| self.means[i])
    }

    /// Named (band, mean) pairs in canonical order
    pub fn named_means(&self) -> impl Iterator<Item = (&str, f32)> {
        self.bands
            .iter()
            .map(|b| b.as_str())
            .zip(self.means.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_psd(bins: usize, df: f32, power: f32) -> Psd {
        Psd {
            frequencies: (0..bins).map(|i| i as f32 * df).collect(),
            powers: vec![power; bins],
        }
    }

    #[test]
    fn test_band_power_monotonic_in_width() {
        let psd = flat_psd(128, 1.0, 2.0);
        let narrow = psd.band_power(10.0, 20.0);
        let wide = psd.band_power(10.0, 40.0);
        assert!(wide > narrow);
    }

    #[test]
    fn test_band_power_half_open_interval() {
        let psd = flat_psd(64, 1.0, 1.0);
        // [10, 12) covers bins 10 and 11 only
        let power = psd.band_power(10.0, 12.0);
        assert!((power - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_band_power_degenerate_psd() {
        let psd = Psd {
            frequencies: vec![0.0],
            powers: vec![1.0],
        };
        assert_eq!(psd.band_power(0.0, 10.0), 0.0);
    }

    #[test]
    fn test_band_tables_overlap_preserved() {
        let bands = FrequencyBand::eeg_bands();
        let alpha = bands.iter().find(|b| b.name == "alpha").unwrap();
        let mu = bands.iter().find(|b| b.name == "mu").unwrap();
        assert!(alpha.low_freq < mu.high_freq && mu.low_freq < alpha.high_freq);
    }

    #[test]
    fn test_summary_lookup() {
        let summary = BandPowerSummary {
            bands: vec!["alpha".to_string(), "beta".to_string()],
            means: vec![0.6, 0.4],
            std_devs: vec![0.1, 0.2],
        };
        assert_eq!(summary.mean_of("alpha"), Some(0.6));
        assert_eq!(summary.mean_of("gamma"), None);
    }
}
