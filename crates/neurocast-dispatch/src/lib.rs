//! Neurocast-Dispatch: pluggable output sinks for pipeline results
//!
//! Every derived quantity leaves the pipeline as a (topic, value) message.
//! Sinks are fire-and-forget; a failing sink logs and never stalls a tick.

pub mod batch;
pub mod dispatcher;
pub mod osc;
pub mod sink;

pub use batch::UdpBatchSink;
pub use dispatcher::{DispatchPolicy, OutputDispatcher, SinkBinding};
pub use osc::OscSink;
pub use sink::{MemorySink, OutputSink, SinkMessage};
