//! JSON batch sink: one datagram per tick

use crate::sink::{OutputSink, SinkMessage};
use neurocast_core::{CastError, CastResult};
use std::net::UdpSocket;

/// Sends the whole tick's batch as a single JSON array datagram.
///
/// Downstream consumers that want a coherent per-tick snapshot (loggers,
/// dashboards) read one datagram instead of reassembling individual values.
pub struct UdpBatchSink {
    socket: UdpSocket,
    target: String,
}

impl UdpBatchSink {
    pub fn new(target: &str) -> CastResult<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|e| CastError::DispatchError {
            sink: "udp-batch".to_string(),
            message: format!("Failed to bind UDP socket: {}", e),
        })?;
        socket
            .set_nonblocking(true)
            .map_err(|e| CastError::DispatchError {
                sink: "udp-batch".to_string(),
                message: format!("Failed to set socket non-blocking: {}", e),
            })?;
        Ok(UdpBatchSink {
            socket,
            target: target.to_string(),
        })
    }
}

impl OutputSink for UdpBatchSink {
    fn name(&self) -> &str {
        "udp-batch"
    }

    fn send(&mut self, messages: &[SinkMessage]) -> CastResult<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let bytes = serde_json::to_vec(messages).map_err(|e| CastError::DispatchError {
            sink: "udp-batch".to_string(),
            message: format!("JSON encoding failed: {}", e),
        })?;
        self.socket
            .send_to(&bytes, &self.target)
            .map_err(|e| CastError::DispatchError {
                sink: "udp-batch".to_string(),
                message: format!("UDP send to {} failed: {}", self.target, e),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_sink_sends_one_datagram_per_tick() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = receiver.local_addr().unwrap().to_string();

        let mut sink = UdpBatchSink::new(&target).unwrap();
        sink.send(&[
            SinkMessage::new("relaxation", "0.71"),
            SinkMessage::new("concentration", "0.29"),
        ])
        .unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let decoded: Vec<SinkMessage> = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].topic, "relaxation");
        assert_eq!(decoded[1].payload, "0.29");
    }

    #[test]
    fn test_empty_batch_sends_nothing() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_nonblocking(true).unwrap();
        let target = receiver.local_addr().unwrap().to_string();

        let mut sink = UdpBatchSink::new(&target).unwrap();
        sink.send(&[]).unwrap();

        let mut buf = [0u8; 64];
        assert!(receiver.recv_from(&mut buf).is_err());
    }
}
