//! Synthetic headset board with bounded per-channel ring buffers

use neurocast_core::{
    AcquisitionSource, CastError, CastResult, ChannelKind, ChannelLayout,
};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One sinusoidal component mixed into every EEG channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tone {
    pub frequency: f32,
    pub amplitude: f32,
}

/// Configuration for the synthetic board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f32,
    /// Sinusoidal components present on every EEG channel
    pub eeg_tones: Vec<Tone>,
    /// Gaussian noise standard deviation added to every channel
    pub noise_std: f32,
    /// Ring buffer length in seconds of history per channel
    pub buffer_secs: f32,
    /// Generate samples from wall-clock time on every snapshot, instead of
    /// requiring explicit `advance` calls
    pub real_time: bool,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 250.0,
            // Dominant alpha rhythm, like eyes-closed resting EEG
            eeg_tones: vec![Tone {
                frequency: 10.0,
                amplitude: 20.0,
            }],
            noise_std: 2.0,
            buffer_secs: 8.0,
            real_time: false,
            seed: None,
        }
    }
}

/// Hardware-free acquisition source.
///
/// `advance` plays the role of the device driver thread: it appends freshly
/// generated samples to every channel's bounded ring buffer. `latest_samples`
/// then snapshots the most recent history, exactly as a real driver's buffer
/// read would. Phase is continuous across calls.
pub struct SyntheticBoard {
    config: BoardConfig,
    layout: ChannelLayout,
    buffers: Vec<VecDeque<f32>>,
    capacity: usize,
    rng: rand::rngs::StdRng,
    noise: Normal<f32>,
    elapsed_samples: u64,
    clock: Option<std::time::Instant>,
    closed: bool,
}

impl SyntheticBoard {
    pub fn new(config: BoardConfig) -> CastResult<Self> {
        if config.sampling_rate <= 0.0 {
            return Err(CastError::ConfigurationError {
                message: format!(
                    "Sampling rate must be positive, got {}",
                    config.sampling_rate
                ),
            });
        }
        let capacity = (config.buffer_secs * config.sampling_rate) as usize;
        if capacity == 0 {
            return Err(CastError::ConfigurationError {
                message: "Ring buffer must hold at least one sample".to_string(),
            });
        }

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });
        let rng = rand::rngs::StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, config.noise_std).map_err(|e| {
            CastError::ConfigurationError {
                message: format!("Invalid noise standard deviation: {}", e),
            }
        })?;

        let layout = ChannelLayout::headset_8ch();
        let buffers = (0..layout.len())
            .map(|_| VecDeque::with_capacity(capacity))
            .collect();

        let clock = config.real_time.then(std::time::Instant::now);

        Ok(SyntheticBoard {
            config,
            layout,
            buffers,
            capacity,
            rng,
            noise,
            elapsed_samples: 0,
            clock,
            closed: false,
        })
    }

    /// Generate `n` new samples on every channel, evicting the oldest when a
    /// ring buffer is full
    pub fn advance(&mut self, n: usize) {
        let dt = 1.0 / self.config.sampling_rate;
        let kinds: Vec<ChannelKind> = self.layout.channels().iter().map(|c| c.kind).collect();
        for step in 0..n {
            let time = (self.elapsed_samples + step as u64) as f32 * dt;
            for (idx, kind) in kinds.iter().enumerate() {
                let value = match kind {
                    ChannelKind::Eeg => self.eeg_sample(time, idx),
                    ChannelKind::Accel => self.inertial_sample(time, idx, 0.5, 0.05),
                    ChannelKind::Gyro => self.inertial_sample(time, idx, 0.3, 0.02),
                };
                let buffer = &mut self.buffers[idx];
                if buffer.len() == self.capacity {
                    buffer.pop_front();
                }
                buffer.push_back(value);
            }
        }
        self.elapsed_samples += n as u64;
    }

    /// Seconds of history currently buffered
    pub fn buffered_secs(&self) -> f32 {
        self.buffers
            .first()
            .map(|b| b.len() as f32 / self.config.sampling_rate)
            .unwrap_or(0.0)
    }

    fn eeg_sample(&mut self, time: f32, channel_idx: usize) -> f32 {
        // Small per-channel phase offset so channels are correlated but not
        // identical
        let phase = channel_idx as f32 * 0.1;
        let mut value = 0.0;
        for tone in &self.config.eeg_tones {
            value += tone.amplitude
                * (2.0 * std::f32::consts::PI * tone.frequency * time + phase).sin();
        }
        value + self.noise.sample(&mut self.rng)
    }

    fn inertial_sample(&mut self, time: f32, channel_idx: usize, freq: f32, amp: f32) -> f32 {
        let phase = channel_idx as f32 * 0.7;
        amp * (2.0 * std::f32::consts::PI * freq * time + phase).sin()
            + self.noise.sample(&mut self.rng) * 0.01
    }
}

impl AcquisitionSource for SyntheticBoard {
    fn channel_layout(&self) -> &ChannelLayout {
        &self.layout
    }

    fn sampling_rate(&self) -> f32 {
        self.config.sampling_rate
    }

    fn latest_samples(&mut self, n: usize) -> CastResult<Vec<Vec<f32>>> {
        if self.closed {
            return Err(CastError::SessionLost {
                reason: "Board session already closed".to_string(),
            });
        }
        // In real-time mode, catch the buffers up to the wall clock first
        if let Some(started) = self.clock {
            let due = (started.elapsed().as_secs_f32() * self.config.sampling_rate) as u64;
            if due > self.elapsed_samples {
                self.advance((due - self.elapsed_samples) as usize);
            }
        }
        Ok(self
            .buffers
            .iter()
            .map(|buffer| {
                let start = buffer.len().saturating_sub(n);
                buffer.iter().skip(start).copied().collect()
            })
            .collect())
    }

    fn close(&mut self) -> CastResult<()> {
        if self.closed {
            return Err(CastError::SessionLost {
                reason: "Board session already closed".to_string(),
            });
        }
        self.closed = true;
        for buffer in self.buffers.iter_mut() {
            buffer.clear();
        }
        Ok(())
    }
}
