//! Per-channel signal conditioning: band-limiting filters plus detrending

use neurocast_core::{CastError, CastResult, ChannelKind};
use serde::{Deserialize, Serialize};

/// One band-limiting stage in a filter chain.
///
/// All parameters are configuration constants; nothing is derived at
/// runtime from the signal itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterStage {
    /// Butterworth bandpass, passband `[low, high]` Hz
    Bandpass { low: f32, high: f32, order: usize },
    /// Notch centered on a mains-interference frequency
    Bandstop { center: f32, bandwidth: f32 },
    /// Butterworth highpass
    Highpass { cutoff: f32, order: usize },
    /// Butterworth lowpass
    Lowpass { cutoff: f32, order: usize },
}

/// DC/trend removal applied after the band-limiting stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetrendMode {
    /// Leave the window untouched
    None,
    /// Subtract the window mean
    Constant,
    /// Subtract a least-squares line fit
    Linear,
}

/// Ordered filter chain for one channel kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Band-limiting stages, applied in order
    pub stages: Vec<FilterStage>,
    /// Trend removal applied last
    pub detrend: DetrendMode,
}

impl ChainConfig {
    /// Passthrough chain (no filtering, no detrend)
    pub fn passthrough() -> Self {
        ChainConfig {
            stages: Vec::new(),
            detrend: DetrendMode::None,
        }
    }
}

/// Per-kind filter chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionerConfig {
    pub eeg: ChainConfig,
    pub accel: ChainConfig,
    pub gyro: ChainConfig,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        ConditionerConfig {
            // Restrict EEG to the usable 1-59Hz range, notch out 50Hz mains
            eeg: ChainConfig {
                stages: vec![
                    FilterStage::Bandpass {
                        low: 1.0,
                        high: 59.0,
                        order: 2,
                    },
                    FilterStage::Bandstop {
                        center: 50.0,
                        bandwidth: 4.0,
                    },
                ],
                detrend: DetrendMode::Constant,
            },
            accel: ChainConfig {
                stages: vec![
                    FilterStage::Highpass {
                        cutoff: 0.1,
                        order: 1,
                    },
                    FilterStage::Lowpass {
                        cutoff: 20.0,
                        order: 1,
                    },
                ],
                detrend: DetrendMode::None,
            },
            gyro: ChainConfig::passthrough(),
        }
    }
}

/// Single biquad section (2nd order IIR), direct form I
#[derive(Debug, Clone)]
struct BiquadSection {
    // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadSection {
    fn new(b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) -> Self {
        BiquadSection {
            b0,
            b1,
            b2,
            a1,
            a2,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Lowpass biquad, Butterworth Q
    fn lowpass(cutoff: f32, fs: f32) -> Self {
        let (sin_w0, cos_w0) = omega(cutoff, fs);
        let alpha = sin_w0 / (2.0 * std::f32::consts::FRAC_1_SQRT_2);
        let a0 = 1.0 + alpha;
        let b1 = (1.0 - cos_w0) / a0;
        let b0 = b1 / 2.0;
        BiquadSection::new(
            b0,
            b1,
            b0,
            (-2.0 * cos_w0) / a0,
            (1.0 - alpha) / a0,
        )
    }

    /// Highpass biquad, Butterworth Q
    fn highpass(cutoff: f32, fs: f32) -> Self {
        let (sin_w0, cos_w0) = omega(cutoff, fs);
        let alpha = sin_w0 / (2.0 * std::f32::consts::FRAC_1_SQRT_2);
        let a0 = 1.0 + alpha;
        let b1 = -(1.0 + cos_w0) / a0;
        let b0 = -b1 / 2.0;
        BiquadSection::new(
            b0,
            b1,
            b0,
            (-2.0 * cos_w0) / a0,
            (1.0 - alpha) / a0,
        )
    }

    /// Constant-peak bandpass biquad; center and Q derived from band edges
    fn bandpass(low: f32, high: f32, fs: f32) -> Self {
        let center = (low * high).sqrt();
        let q = center / (high - low);
        let (sin_w0, cos_w0) = omega(center, fs);
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        BiquadSection::new(
            alpha / a0,
            0.0,
            -alpha / a0,
            (-2.0 * cos_w0) / a0,
            (1.0 - alpha) / a0,
        )
    }

    /// Notch biquad centered on `center` with `bandwidth` Hz stop band
    fn notch(center: f32, bandwidth: f32, fs: f32) -> Self {
        let q = center / bandwidth;
        let (sin_w0, cos_w0) = omega(center, fs);
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        BiquadSection::new(
            1.0 / a0,
            (-2.0 * cos_w0) / a0,
            1.0 / a0,
            (-2.0 * cos_w0) / a0,
            (1.0 - alpha) / a0,
        )
    }
}

fn omega(freq: f32, fs: f32) -> (f32, f32) {
    let w0 = 2.0 * std::f32::consts::PI * freq / fs;
    (libm::sinf(w0), libm::cosf(w0))
}

/// Deterministic per-channel filter chain.
///
/// Purely a function of the current window and fixed configuration: biquad
/// state lives only for the duration of one `apply` call, matching the
/// window-at-a-time filtering of the acquisition layer.
pub struct SignalConditioner {
    config: ConditionerConfig,
    sampling_rate: f32,
}

impl SignalConditioner {
    pub fn new(config: ConditionerConfig, sampling_rate: f32) -> CastResult<Self> {
        if sampling_rate <= 0.0 {
            return Err(CastError::ConfigurationError {
                message: format!("Sampling rate must be positive, got {}", sampling_rate),
            });
        }
        let nyquist = sampling_rate / 2.0;
        for chain in [&config.eeg, &config.accel, &config.gyro] {
            for stage in &chain.stages {
                Self::validate_stage(stage, nyquist)?;
            }
        }
        Ok(SignalConditioner {
            config,
            sampling_rate,
        })
    }

    fn validate_stage(stage: &FilterStage, nyquist: f32) -> CastResult<()> {
        let ok = match stage {
            FilterStage::Bandpass { low, high, order } => {
                *low > 0.0 && low < high && *high < nyquist && *order >= 1
            }
            FilterStage::Bandstop { center, bandwidth } => {
                *center > 0.0 && *bandwidth > 0.0 && *center < nyquist
            }
            FilterStage::Highpass { cutoff, order } | FilterStage::Lowpass { cutoff, order } => {
                *cutoff > 0.0 && *cutoff < nyquist && *order >= 1
            }
        };
        if ok {
            Ok(())
        } else {
            Err(CastError::ConfigurationError {
                message: format!(
                    "Filter stage {:?} invalid for Nyquist frequency {}Hz",
                    stage, nyquist
                ),
            })
        }
    }

    fn chain_for(&self, kind: ChannelKind) -> &ChainConfig {
        match kind {
            ChannelKind::Eeg => &self.config.eeg,
            ChannelKind::Accel => &self.config.accel,
            ChannelKind::Gyro => &self.config.gyro,
        }
    }

    /// Apply the configured chain for `kind` to one channel window.
    ///
    /// A degenerate window (empty input) is a channel-local error; the
    /// caller substitutes zeros so one misbehaving channel never aborts the
    /// whole tick.
    pub fn apply(&self, kind: ChannelKind, samples: &[f32]) -> CastResult<Vec<f32>> {
        if samples.is_empty() {
            return Err(CastError::ChannelError {
                channel: format!("{:?}", kind),
                message: "Cannot condition an empty window".to_string(),
            });
        }

        let chain = self.chain_for(kind);
        let mut data = samples.to_vec();

        for stage in &chain.stages {
            // One biquad section covers two filter orders
            let passes = match stage {
                FilterStage::Bandpass { order, .. }
                | FilterStage::Highpass { order, .. }
                | FilterStage::Lowpass { order, .. } => (*order + 1) / 2,
                FilterStage::Bandstop { .. } => 1,
            };
            for _ in 0..passes {
                let mut biquad = match stage {
                    FilterStage::Bandpass { low, high, .. } => {
                        BiquadSection::bandpass(*low, *high, self.sampling_rate)
                    }
                    FilterStage::Bandstop { center, bandwidth } => {
                        BiquadSection::notch(*center, *bandwidth, self.sampling_rate)
                    }
                    FilterStage::Highpass { cutoff, .. } => {
                        BiquadSection::highpass(*cutoff, self.sampling_rate)
                    }
                    FilterStage::Lowpass { cutoff, .. } => {
                        BiquadSection::lowpass(*cutoff, self.sampling_rate)
                    }
                };
                for sample in data.iter_mut() {
                    *sample = biquad.process_sample(*sample);
                }
            }
        }

        match chain.detrend {
            DetrendMode::None => {}
            DetrendMode::Constant => detrend_constant(&mut data),
            DetrendMode::Linear => detrend_linear(&mut data),
        }

        Ok(data)
    }

    pub fn sampling_rate(&self) -> f32 {
        self.sampling_rate
    }
}

/// Subtract the window mean
fn detrend_constant(data: &mut [f32]) {
    let mean = data.iter().sum::<f32>() / data.len() as f32;
    for x in data.iter_mut() {
        *x -= mean;
    }
}

/// Subtract a least-squares line fit
fn detrend_linear(data: &mut [f32]) {
    let n = data.len() as f32;
    if data.len() < 2 {
        detrend_constant(data);
        return;
    }

    let x_mean = (n - 1.0) / 2.0;
    let y_mean = data.iter().sum::<f32>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in data.iter().enumerate() {
        let dx = i as f32 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }

    let slope = if den > 0.0 { num / den } else { 0.0 };
    let intercept = y_mean - slope * x_mean;

    for (i, y) in data.iter_mut().enumerate() {
        *y -= slope * i as f32 + intercept;
    }
}
