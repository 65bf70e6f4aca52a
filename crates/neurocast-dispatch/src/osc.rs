//! OSC-over-UDP sink for continuous control streams

use crate::sink::{OutputSink, SinkMessage};
use neurocast_core::{CastError, CastResult};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

/// Sends each message as an OSC packet `address [topic, payload]`.
///
/// UDP is fire-and-forget: a full socket buffer or unreachable peer surfaces
/// as a `DispatchError` and is dropped by the dispatcher, never retried.
pub struct OscSink {
    socket: UdpSocket,
    target: String,
    address: String,
}

impl OscSink {
    /// Bind an ephemeral local port and aim at `target` (e.g.
    /// `127.0.0.1:6010`). `address` is the OSC address pattern, typically
    /// `/ctrl`.
    pub fn new(target: &str, address: &str) -> CastResult<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|e| CastError::DispatchError {
            sink: "osc".to_string(),
            message: format!("Failed to bind UDP socket: {}", e),
        })?;
        socket
            .set_nonblocking(true)
            .map_err(|e| CastError::DispatchError {
                sink: "osc".to_string(),
                message: format!("Failed to set socket non-blocking: {}", e),
            })?;
        Ok(OscSink {
            socket,
            target: target.to_string(),
            address: address.to_string(),
        })
    }
}

impl OutputSink for OscSink {
    fn name(&self) -> &str {
        "osc"
    }

    fn send(&mut self, messages: &[SinkMessage]) -> CastResult<()> {
        for message in messages {
            let packet = OscPacket::Message(OscMessage {
                addr: self.address.clone(),
                args: vec![
                    OscType::String(message.topic.clone()),
                    OscType::String(message.payload.clone()),
                ],
            });
            let bytes = encoder::encode(&packet).map_err(|e| CastError::DispatchError {
                sink: "osc".to_string(),
                message: format!("OSC encoding failed: {:?}", e),
            })?;
            self.socket
                .send_to(&bytes, &self.target)
                .map_err(|e| CastError::DispatchError {
                    sink: "osc".to_string(),
                    message: format!("UDP send to {} failed: {}", self.target, e),
                })?;
        }
        Ok(())
    }
}
