//! Dispatch fan-out with per-sink change suppression

use crate::sink::{OutputSink, SinkMessage};
use std::collections::HashMap;
use tracing::warn;

/// What a sink receives each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Every value every tick, even when unchanged
    Continuous,
    /// Only values whose formatted payload changed since the last send
    Deduplicated,
}

/// One registered sink plus its policy and change-suppression cache.
///
/// The cache is keyed on the formatted payload, so equality is decided at
/// output precision: values that round to the same string are duplicates.
pub struct SinkBinding {
    sink: Box<dyn OutputSink>,
    policy: DispatchPolicy,
    last_sent: HashMap<String, String>,
}

/// Fans pipeline values out to all registered sinks.
///
/// Delivery failures are logged and dropped; one broken sink never stalls a
/// tick or starves the others.
pub struct OutputDispatcher {
    bindings: Vec<SinkBinding>,
    precision: usize,
}

impl OutputDispatcher {
    /// `precision` is the number of fractional digits every value is
    /// rendered with before dispatch and dedup comparison.
    pub fn new(precision: usize) -> Self {
        OutputDispatcher {
            bindings: Vec::new(),
            precision,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn OutputSink>, policy: DispatchPolicy) {
        self.bindings.push(SinkBinding {
            sink,
            policy,
            last_sent: HashMap::new(),
        });
    }

    pub fn sink_count(&self) -> usize {
        self.bindings.len()
    }

    /// Deliver one tick's values to every sink according to its policy
    pub fn dispatch(&mut self, values: &[(&str, f32)]) {
        if self.bindings.is_empty() || values.is_empty() {
            return;
        }

        let rendered: Vec<SinkMessage> = values
            .iter()
            .map(|&(topic, value)| {
                SinkMessage::new(topic, &format!("{:.prec$}", value, prec = self.precision))
            })
            .collect();

        for binding in self.bindings.iter_mut() {
            let batch: Vec<SinkMessage> = match binding.policy {
                DispatchPolicy::Continuous => rendered.clone(),
                DispatchPolicy::Deduplicated => rendered
                    .iter()
                    .filter(|m| {
                        binding.last_sent.get(&m.topic) != Some(&m.payload)
                    })
                    .cloned()
                    .collect(),
            };

            if batch.is_empty() {
                continue;
            }

            if let Err(e) = binding.sink.send(&batch) {
                warn!(sink = binding.sink.name(), error = %e, "Sink delivery failed, dropping batch");
                continue;
            }

            // Cache updates only after a successful send, so a dropped batch
            // is retried as soon as the sink recovers
            if binding.policy == DispatchPolicy::Deduplicated {
                for m in &batch {
                    binding.last_sent.insert(m.topic.clone(), m.payload.clone());
                }
            }
        }
    }
}
