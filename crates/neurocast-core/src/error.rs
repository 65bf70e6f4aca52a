//! Error handling for the Neurocast pipeline
//!
//! One framework error type covering configuration, acquisition, per-channel
//! processing, inference and dispatch failures.

use std::fmt;

/// Result type alias for Neurocast operations
pub type CastResult<T> = Result<T, CastError>;

/// Error type for all Neurocast pipeline operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CastError {
    /// Invalid configuration value
    ConfigurationError {
        message: String,
    },

    /// Acquisition subsystem failure that is recoverable for this tick
    AcquisitionError {
        message: String,
    },

    /// Acquisition session is gone; the pipeline cannot continue
    SessionLost {
        reason: String,
    },

    /// A filter or spectral step failed for one channel
    ChannelError {
        channel: String,
        message: String,
    },

    /// Generic processing failure not tied to one channel
    ProcessingError {
        message: String,
    },

    /// Inference model lifecycle or predict failure
    ModelError {
        model: String,
        message: String,
    },

    /// Output sink send failure
    DispatchError {
        sink: String,
        message: String,
    },
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            CastError::AcquisitionError { message } => {
                write!(f, "Acquisition error: {}", message)
            }
            CastError::SessionLost { reason } => {
                write!(f, "Acquisition session lost: {}", reason)
            }
            CastError::ChannelError { channel, message } => {
                write!(f, "Channel '{}' error: {}", channel, message)
            }
            CastError::ProcessingError { message } => {
                write!(f, "Processing error: {}", message)
            }
            CastError::ModelError { model, message } => {
                write!(f, "Model '{}' error: {}", model, message)
            }
            CastError::DispatchError { sink, message } => {
                write!(f, "Dispatch error for sink '{}': {}", sink, message)
            }
        }
    }
}

impl std::error::Error for CastError {}

impl CastError {
    /// True when the error must stop the scheduler
    pub fn is_fatal(&self) -> bool {
        matches!(self, CastError::SessionLost { .. })
    }
}
