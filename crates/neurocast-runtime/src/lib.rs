//! Neurocast-Runtime: pipeline orchestration
//!
//! Ties acquisition, conditioning, spectral analysis, classification and
//! dispatch together under a fixed-rate tick scheduler, and owns the
//! runtime configuration surface.

pub mod classifier;
pub mod config;
pub mod scheduler;

pub use classifier::{BandRatioModel, StateClassifier};
pub use config::RuntimeConfig;
pub use scheduler::{Scheduler, SchedulerCommand, SchedulerState, TickOutcome};
