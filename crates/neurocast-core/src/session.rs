//! Acquisition boundary contract and session identity

use crate::channel::ChannelLayout;
use crate::error::CastResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// External producer of raw per-channel samples.
///
/// The core only ever reads a snapshot of the most recent samples at the
/// start of a tick; providing a consistent snapshot under concurrent writes
/// (e.g. via an internal ring buffer) is the implementor's responsibility.
/// Short snapshots are normal during stream startup and never an error;
/// a lost session is reported through `CastError::SessionLost` and is the
/// only fatal acquisition condition.
pub trait AcquisitionSource: Send {
    /// Ordered channel roles for this session
    fn channel_layout(&self) -> &ChannelLayout;

    /// Sampling rate in Hz
    fn sampling_rate(&self) -> f32;

    /// Snapshot of up to `n` most recent samples for every channel.
    ///
    /// Channels may return fewer than `n` samples; consumers zero-pad.
    fn latest_samples(&mut self, n: usize) -> CastResult<Vec<Vec<f32>>>;

    /// Tear down the acquisition session; called exactly once at shutdown
    fn close(&mut self) -> CastResult<()>;
}

/// Immutable facts about one pipeline session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Unique session identifier
    pub id: Uuid,
    /// Channel layout fixed at session start
    pub layout: ChannelLayout,
    /// Sampling rate in Hz
    pub sampling_rate: f32,
    /// Session start, milliseconds since the Unix epoch
    pub started_at: u64,
}

impl SessionInfo {
    pub fn new(layout: ChannelLayout, sampling_rate: f32) -> Self {
        SessionInfo {
            id: Uuid::new_v4(),
            layout,
            sampling_rate,
            started_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        }
    }
}
