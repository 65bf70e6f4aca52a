//! Welch spectral estimation and cross-channel band-power summaries

use neurocast_core::{BandPowerSummary, BandPowers, CastError, CastResult, FrequencyBand, Psd};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Welch estimator parameters.
///
/// Segment length defaults to the power of two nearest the sampling rate,
/// so the frequency resolution stays close to 1Hz regardless of hardware.
/// Band tables are configuration; overlapping ranges are legitimate because
/// different consumers read different subsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// FFT segment length override; must be a power of two
    pub nfft: Option<usize>,
    /// Bands integrated per channel
    pub channel_bands: Vec<FrequencyBand>,
    /// Canonical feature-generating bands, order significant
    pub summary_bands: Vec<FrequencyBand>,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        SpectralConfig {
            nfft: None,
            channel_bands: FrequencyBand::eeg_bands(),
            summary_bands: FrequencyBand::summary_bands(),
        }
    }
}

/// Stateless-per-tick spectral analyzer.
///
/// The FFT plan is built once at construction and shared across ticks; the
/// per-segment scratch buffers are the only allocation per call.
pub struct SpectralAnalyzer {
    sampling_rate: f32,
    nfft: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Sum of squared window coefficients, for PSD normalization
    window_power: f32,
    channel_bands: Vec<FrequencyBand>,
    summary_bands: Vec<FrequencyBand>,
}

impl SpectralAnalyzer {
    pub fn new(config: SpectralConfig, sampling_rate: f32) -> CastResult<Self> {
        if sampling_rate <= 0.0 {
            return Err(CastError::ConfigurationError {
                message: format!("Sampling rate must be positive, got {}", sampling_rate),
            });
        }

        let nfft = match config.nfft {
            Some(n) => {
                if !n.is_power_of_two() || n < 8 {
                    return Err(CastError::ConfigurationError {
                        message: format!("FFT length must be a power of two >= 8, got {}", n),
                    });
                }
                n
            }
            None => nearest_power_of_two(sampling_rate as usize),
        };

        if config.summary_bands.is_empty() {
            return Err(CastError::ConfigurationError {
                message: "Summary band table cannot be empty".to_string(),
            });
        }

        let fft = FftPlanner::new().plan_fft_forward(nfft);
        let window = blackman_harris(nfft);
        let window_power = window.iter().map(|w| w * w).sum();

        Ok(SpectralAnalyzer {
            sampling_rate,
            nfft,
            fft,
            window,
            window_power,
            channel_bands: config.channel_bands,
            summary_bands: config.summary_bands,
        })
    }

    pub fn nfft(&self) -> usize {
        self.nfft
    }

    /// Band table integrated per channel
    pub fn channel_bands(&self) -> &[FrequencyBand] {
        &self.channel_bands
    }

    /// Welch power spectral density of one channel window.
    ///
    /// Segments of `nfft` samples with 50% overlap, Blackman-Harris
    /// windowed, periodograms averaged. The window must hold at least one
    /// full segment.
    pub fn psd(&self, samples: &[f32]) -> CastResult<Psd> {
        if samples.len() < self.nfft {
            return Err(CastError::ProcessingError {
                message: format!(
                    "Window of {} samples is shorter than FFT length {}",
                    samples.len(),
                    self.nfft
                ),
            });
        }

        let step = self.nfft / 2;
        let num_segments = (samples.len() - self.nfft) / step + 1;
        let num_bins = self.nfft / 2 + 1;

        let mut accumulated = vec![0.0f32; num_bins];
        let mut buffer = vec![Complex::new(0.0f32, 0.0f32); self.nfft];

        for seg in 0..num_segments {
            let start = seg * step;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(samples[start + i] * self.window[i], 0.0);
            }
            self.fft.process(&mut buffer);

            for (k, acc) in accumulated.iter_mut().enumerate() {
                *acc += buffer[k].norm_sqr();
            }
        }

        let scale = 1.0 / (num_segments as f32 * self.sampling_rate * self.window_power);
        let mut powers = Vec::with_capacity(num_bins);
        for (k, &acc) in accumulated.iter().enumerate() {
            let mut p = acc * scale;
            // One-sided spectrum: double everything except DC and Nyquist
            if k != 0 && k != num_bins - 1 {
                p *= 2.0;
            }
            powers.push(p);
        }

        let frequencies = (0..num_bins)
            .map(|k| k as f32 * self.sampling_rate / self.nfft as f32)
            .collect();

        Ok(Psd {
            frequencies,
            powers,
        })
    }

    /// Integrated power for every configured band of one channel
    pub fn band_powers(&self, samples: &[f32]) -> CastResult<BandPowers> {
        let psd = self.psd(samples)?;
        let mut powers = BandPowers::new();
        for band in &self.channel_bands {
            powers.set(&band.name, psd.band_power_of(band));
        }
        Ok(powers)
    }

    /// Cross-channel band-power summary over the canonical band subset.
    ///
    /// Each channel's band-power vector is normalized to unit sum before
    /// aggregation, so the summary expresses relative band dominance rather
    /// than absolute amplitude. Means and population standard deviations are
    /// taken across channels, band by band.
    pub fn summarize(&self, channels: &[Vec<f32>]) -> CastResult<BandPowerSummary> {
        if channels.is_empty() {
            return Err(CastError::ProcessingError {
                message: "Cannot summarize zero channels".to_string(),
            });
        }

        let bands = &self.summary_bands;
        let mut per_channel: Vec<Vec<f32>> = Vec::with_capacity(channels.len());

        for samples in channels {
            let psd = self.psd(samples)?;
            let mut row: Vec<f32> = bands.iter().map(|b| psd.band_power_of(b)).collect();
            let total: f32 = row.iter().sum();
            if total > 0.0 {
                for v in row.iter_mut() {
                    *v /= total;
                }
            }
            per_channel.push(row);
        }

        let n = per_channel.len() as f32;
        let mut means = Vec::with_capacity(bands.len());
        let mut std_devs = Vec::with_capacity(bands.len());

        for band_idx in 0..bands.len() {
            let mean = per_channel.iter().map(|row| row[band_idx]).sum::<f32>() / n;
            let variance = per_channel
                .iter()
                .map(|row| {
                    let d = row[band_idx] - mean;
                    d * d
                })
                .sum::<f32>()
                / n;
            means.push(mean);
            std_devs.push(variance.sqrt());
        }

        Ok(BandPowerSummary {
            bands: bands.iter().map(|b| b.name.clone()).collect(),
            means,
            std_devs,
        })
    }
}

/// Power of two closest to `value`
fn nearest_power_of_two(value: usize) -> usize {
    if value <= 8 {
        return 8;
    }
    let lower = usize::pow(2, (value as f32).log2().floor() as u32);
    let upper = lower * 2;
    if value - lower < upper - value {
        lower
    } else {
        upper
    }
}

/// Four-term Blackman-Harris window of length `n`
fn blackman_harris(n: usize) -> Vec<f32> {
    const A0: f32 = 0.35875;
    const A1: f32 = 0.48829;
    const A2: f32 = 0.14128;
    const A3: f32 = 0.01168;

    let denom = (n - 1) as f32;
    (0..n)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / denom;
            A0 - A1 * libm::cosf(x) + A2 * libm::cosf(2.0 * x) - A3 * libm::cosf(3.0 * x)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f32 = 250.0;

    fn analyzer() -> SpectralAnalyzer {
        SpectralAnalyzer::new(SpectralConfig::default(), FS).unwrap()
    }

    fn sine(freq: f32, amplitude: f32, samples: usize) -> Vec<f32> {
        (0..samples)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / FS).sin()
            })
            .collect()
    }

    #[test]
    fn test_nearest_power_of_two() {
        assert_eq!(nearest_power_of_two(250), 256);
        assert_eq!(nearest_power_of_two(256), 256);
        assert_eq!(nearest_power_of_two(300), 256);
        assert_eq!(nearest_power_of_two(1000), 1024);
    }

    #[test]
    fn test_default_nfft_tracks_sampling_rate() {
        assert_eq!(analyzer().nfft(), 256);
    }

    #[test]
    fn test_psd_peak_at_tone_frequency() {
        let psd = analyzer().psd(&sine(10.0, 20.0, 1000)).unwrap();

        let peak_idx = psd
            .powers
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        let peak_freq = psd.frequencies[peak_idx];
        assert!(
            (peak_freq - 10.0).abs() < 1.5,
            "peak at {}Hz, expected near 10Hz",
            peak_freq
        );
    }

    #[test]
    fn test_zero_input_zero_psd() {
        let psd = analyzer().psd(&vec![0.0; 1000]).unwrap();
        assert!(psd.powers.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_short_window_rejected() {
        let result = analyzer().psd(&vec![0.0; 100]);
        assert!(matches!(result, Err(CastError::ProcessingError { .. })));
    }

    #[test]
    fn test_non_power_of_two_nfft_rejected() {
        let result = SpectralAnalyzer::new(
            SpectralConfig {
                nfft: Some(300),
                ..SpectralConfig::default()
            },
            FS,
        );
        assert!(matches!(result, Err(CastError::ConfigurationError { .. })));
    }

    #[test]
    fn test_band_powers_concentrated_around_tone() {
        let powers = analyzer().band_powers(&sine(10.0, 20.0, 1000)).unwrap();
        let alpha = powers.get("alpha").unwrap();
        let gamma = powers.get("gamma").unwrap();
        assert!(
            alpha > 10.0 * gamma,
            "alpha {} should dominate gamma {}",
            alpha,
            gamma
        );
    }

    #[test]
    fn test_summary_means_sum_to_one() {
        let channels: Vec<Vec<f32>> = (0..4).map(|_| sine(10.0, 20.0, 1000)).collect();
        let summary = analyzer().summarize(&channels).unwrap();
        let total: f32 = summary.means.iter().sum();
        assert!((total - 1.0).abs() < 1e-3, "means sum to {}", total);
    }

    #[test]
    fn test_summary_std_zero_for_identical_channels() {
        let channels: Vec<Vec<f32>> = (0..4).map(|_| sine(10.0, 20.0, 1000)).collect();
        let summary = analyzer().summarize(&channels).unwrap();
        assert!(summary.std_devs.iter().all(|&s| s < 1e-6));
    }

    #[test]
    fn test_summary_rejects_empty_channel_set() {
        let result = analyzer().summarize(&[]);
        assert!(matches!(result, Err(CastError::ProcessingError { .. })));
    }
}
