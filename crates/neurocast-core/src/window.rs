//! SampleWindow: the most recent fixed-length span of samples per channel

use crate::error::{CastError, CastResult};

/// Fixed-length window of the most recent samples for every channel.
///
/// Refilled every tick from an acquisition snapshot. The length invariant is
/// absolute: each channel holds exactly `required` samples. When the
/// acquisition subsystem holds fewer samples than required (stream just
/// started), the window is left-padded with zeros so the oldest entries are
/// zero rather than garbage. Short data is a normal startup transient, not
/// an error.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    data: Vec<Vec<f32>>,
    required: usize,
}

impl SampleWindow {
    /// Build a window from an acquisition snapshot.
    ///
    /// `snapshot` holds the most recent samples per channel, possibly fewer
    /// or more than `required`. Longer channels are truncated to their most
    /// recent `required` samples; shorter channels are left-zero-padded.
    pub fn from_snapshot(snapshot: Vec<Vec<f32>>, required: usize) -> CastResult<Self> {
        if required == 0 {
            return Err(CastError::ConfigurationError {
                message: "Window length must be greater than 0".to_string(),
            });
        }
        if snapshot.is_empty() {
            return Err(CastError::AcquisitionError {
                message: "Snapshot holds no channels".to_string(),
            });
        }

        let mut data = Vec::with_capacity(snapshot.len());
        for samples in snapshot {
            if samples.len() >= required {
                let start = samples.len() - required;
                data.push(samples[start..].to_vec());
            } else {
                let mut padded = vec![0.0; required - samples.len()];
                padded.extend_from_slice(&samples);
                data.push(padded);
            }
        }

        Ok(SampleWindow { data, required })
    }

    /// Window with all channels zero-filled
    pub fn zeros(channel_count: usize, required: usize) -> Self {
        SampleWindow {
            data: vec![vec![0.0; required]; channel_count],
            required,
        }
    }

    /// Samples per channel (always the configured window length)
    pub fn len(&self) -> usize {
        self.required
    }

    /// True when the window length is zero (never constructible via
    /// `from_snapshot`)
    pub fn is_empty(&self) -> bool {
        self.required == 0
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.data.len()
    }

    /// Samples for one channel, oldest first
    pub fn channel(&self, index: usize) -> CastResult<&[f32]> {
        self.data
            .get(index)
            .map(|v| v.as_slice())
            .ok_or_else(|| CastError::ChannelError {
                channel: format!("#{}", index),
                message: format!(
                    "Channel index {} out of bounds (0-{})",
                    index,
                    self.data.len().saturating_sub(1)
                ),
            })
    }

    /// All channels, oldest sample first
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.data
    }
}
