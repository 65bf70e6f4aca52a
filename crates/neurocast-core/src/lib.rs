//! Neurocast-Core: Foundation types for the biosignal control pipeline
//!
//! Channel layout, sample windows, frequency bands, feature vectors and the
//! boundary traits consumed by the rest of the workspace.

pub mod bands;
pub mod channel;
pub mod error;
pub mod features;
pub mod session;
pub mod window;

pub use bands::*;
pub use channel::*;
pub use error::{CastError, CastResult};
pub use features::*;
pub use session::*;
pub use window::*;
