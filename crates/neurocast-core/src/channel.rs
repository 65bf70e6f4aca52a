//! Channel identity and session channel layout

use crate::error::{CastError, CastResult};
use serde::{Deserialize, Serialize};

/// Physical or derived signal source behind one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    /// EEG electrode
    Eeg,
    /// Accelerometer axis
    Accel,
    /// Gyroscope axis
    Gyro,
}

/// One channel in the acquisition stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Row index in the acquisition snapshot
    pub index: usize,
    /// Display name (electrode label or axis name)
    pub name: String,
    /// Signal source kind
    pub kind: ChannelKind,
}

/// Ordered channel set assigned at session start from board metadata.
///
/// Immutable for the lifetime of a session; all per-channel buffers in the
/// pipeline are addressed through this layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLayout {
    channels: Vec<Channel>,
}

impl ChannelLayout {
    /// Build a layout from an ordered channel list
    pub fn new(channels: Vec<Channel>) -> CastResult<Self> {
        if channels.is_empty() {
            return Err(CastError::ConfigurationError {
                message: "Channel layout cannot be empty".to_string(),
            });
        }
        for (i, ch) in channels.iter().enumerate() {
            if ch.index != i {
                return Err(CastError::ConfigurationError {
                    message: format!(
                        "Channel '{}' has index {} but occupies position {}",
                        ch.name, ch.index, i
                    ),
                });
            }
        }
        Ok(ChannelLayout { channels })
    }

    /// Typical 8-electrode EEG headset with 3-axis accelerometer and gyro
    pub fn headset_8ch() -> Self {
        let mut channels = Vec::new();
        let electrodes = ["Fz", "C3", "Cz", "C4", "Pz", "PO7", "Oz", "PO8"];
        for (i, name) in electrodes.iter().enumerate() {
            channels.push(Channel {
                index: i,
                name: (*name).to_string(),
                kind: ChannelKind::Eeg,
            });
        }
        for (i, axis) in ["X", "Y", "Z"].iter().enumerate() {
            channels.push(Channel {
                index: electrodes.len() + i,
                name: format!("ACCEL-{}", axis),
                kind: ChannelKind::Accel,
            });
        }
        for (i, axis) in ["X", "Y", "Z"].iter().enumerate() {
            channels.push(Channel {
                index: electrodes.len() + 3 + i,
                name: format!("GYRO-{}", axis),
                kind: ChannelKind::Gyro,
            });
        }
        ChannelLayout { channels }
    }

    /// All channels in acquisition order
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Total channel count
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when the layout holds no channels
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channels of one kind, in layout order
    pub fn of_kind(&self, kind: ChannelKind) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(move |c| c.kind == kind)
    }

    /// EEG channel indices, in layout order
    pub fn eeg_indices(&self) -> Vec<usize> {
        self.of_kind(ChannelKind::Eeg).map(|c| c.index).collect()
    }

    /// Number of EEG channels
    pub fn eeg_count(&self) -> usize {
        self.of_kind(ChannelKind::Eeg).count()
    }

    /// Look up a channel by index
    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }
}
