//! Output sink contract and the in-memory sink used by tests

use neurocast_core::{CastError, CastResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// One value leaving the pipeline: a topic name plus its formatted payload.
///
/// The payload is already rendered at the configured precision, so every
/// sink behind the same dispatcher emits byte-identical values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkMessage {
    pub topic: String,
    pub payload: String,
}

impl SinkMessage {
    pub fn new(topic: &str, payload: &str) -> Self {
        SinkMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        }
    }
}

/// Transport endpoint for dispatched messages.
///
/// `send` receives the full batch for one tick. Implementations must not
/// block the tick on delivery; failures are reported through the result and
/// isolated by the dispatcher.
pub trait OutputSink: Send {
    /// Human-readable sink name, used in logs
    fn name(&self) -> &str;

    /// Deliver one tick's batch of messages
    fn send(&mut self, messages: &[SinkMessage]) -> CastResult<()>;
}

/// Sink that records every batch in memory.
#[derive(Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<Vec<SinkMessage>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded batches; clones observe future sends
    pub fn batches(&self) -> Arc<Mutex<Vec<Vec<SinkMessage>>>> {
        Arc::clone(&self.batches)
    }
}

impl OutputSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn send(&mut self, messages: &[SinkMessage]) -> CastResult<()> {
        let mut batches = self.batches.lock().map_err(|_| CastError::DispatchError {
            sink: "memory".to_string(),
            message: "Recorder lock poisoned".to_string(),
        })?;
        batches.push(messages.to_vec());
        Ok(())
    }
}
