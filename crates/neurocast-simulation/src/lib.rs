//! Neurocast-Simulation: synthetic acquisition source for hardware-free runs
//!
//! Generates EEG-like tones plus noise and slow inertial drift behind the
//! same acquisition contract a real headset driver implements.

pub mod board;

pub use board::{BoardConfig, SyntheticBoard, Tone};
