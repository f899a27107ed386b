// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Provisioning Channel
//!
//! The persistent signaling connection a new device holds open while
//! awaiting linking. Delivery is push-based and strictly ordered: the
//! provisioning UUID arrives first, then the encrypted envelope. Either may
//! be delayed indefinitely; the caller-supplied poll timeout is the only
//! bound.

mod error;
mod transport;
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
mod websocket;

pub use error::ChannelError;
pub use transport::{FrameTransport, MockFrameTransport};
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use websocket::{WebSocketFrameTransport, WebSocketTransportConfig};

use std::time::{Duration, Instant};

use prost::Message;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::crypto::EncryptedEnvelope;
use crate::wire::{ChannelFrame, ChannelResponse, FrameType, ProvisioningAddress};

/// Heartbeat interval while the channel is open.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Connection state of the provisioning channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

/// Events delivered over the channel, in order.
#[derive(Debug)]
pub enum ChannelEvent {
    /// The provisioning UUID assigned to this linking attempt.
    UuidReceived(Uuid),
    /// The encrypted provisioning envelope from the primary device.
    EnvelopeReceived(EncryptedEnvelope),
}

/// State machine run by the new device while awaiting linking.
pub struct ProvisioningChannel<T: FrameTransport> {
    transport: T,
    state: ChannelState,
    next_heartbeat: Instant,
}

impl<T: FrameTransport> ProvisioningChannel<T> {
    /// Creates a channel over the given transport. No connection is made
    /// until [`connect`](Self::connect).
    pub fn new(transport: T) -> Self {
        ProvisioningChannel {
            transport,
            state: ChannelState::Disconnected,
            next_heartbeat: Instant::now() + HEARTBEAT_INTERVAL,
        }
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Establishes the connection.
    pub fn connect(&mut self) -> Result<(), ChannelError> {
        if self.state == ChannelState::Open {
            return Ok(());
        }

        self.state = ChannelState::Connecting;
        self.transport.connect().inspect_err(|_| {
            self.state = ChannelState::Disconnected;
        })?;

        self.state = ChannelState::Open;
        self.next_heartbeat = Instant::now() + HEARTBEAT_INTERVAL;
        debug!("provisioning channel open");
        Ok(())
    }

    /// Waits up to `timeout` for the next inbound event.
    ///
    /// Returns `Ok(None)` when no frame arrived in time. Every handled
    /// request is acknowledged with a success response before the event is
    /// surfaced, so the peer may send the next frame. A heartbeat ping is
    /// sent whenever the interval has elapsed.
    pub fn poll_event(&mut self, timeout: Duration) -> Result<Option<ChannelEvent>, ChannelError> {
        if self.state != ChannelState::Open {
            return Err(ChannelError::NotConnected);
        }

        if Instant::now() >= self.next_heartbeat {
            self.transport.send_ping()?;
            self.next_heartbeat = Instant::now() + HEARTBEAT_INTERVAL;
        }

        let frame = match self.transport.recv_frame(timeout) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(ChannelError::ConnectionClosed) => {
                self.state = ChannelState::Closed;
                return Err(ChannelError::ConnectionClosed);
            }
            Err(e) => return Err(e),
        };

        self.handle_frame(frame).map(Some)
    }

    /// Cancels the heartbeat and tears the connection down. Idempotent.
    pub fn disconnect(&mut self) {
        if self.state == ChannelState::Disconnected {
            return;
        }
        self.transport.close();
        self.state = ChannelState::Disconnected;
        debug!("provisioning channel disconnected");
    }

    fn handle_frame(&mut self, frame: ChannelFrame) -> Result<ChannelEvent, ChannelError> {
        let frame_type = frame
            .r#type
            .and_then(|t| FrameType::try_from(t).ok())
            .unwrap_or(FrameType::Unknown);

        let request = match (frame_type, frame.request) {
            (FrameType::Request, Some(request)) => request,
            _ => {
                warn!("unexpected non-request frame on provisioning channel");
                return Err(ChannelError::ProtocolViolation(
                    "expected a request frame".to_string(),
                ));
            }
        };

        let verb = request.verb.as_deref().unwrap_or("");
        let path = request.path.as_deref().unwrap_or("");
        let body = request.body.as_deref().unwrap_or(&[]);

        match (verb, path) {
            ("PUT", "/v1/address") => {
                let address = ProvisioningAddress::decode(body)
                    .map_err(|e| ChannelError::InvalidFrame(format!("bad address body: {}", e)))?;
                let uuid = address
                    .uuid
                    .as_deref()
                    .and_then(|u| Uuid::parse_str(u).ok())
                    .ok_or_else(|| {
                        ChannelError::InvalidFrame("unparsable provisioning uuid".to_string())
                    })?;

                self.acknowledge(request.id, 200, "OK")?;
                debug!("provisioning uuid received");
                Ok(ChannelEvent::UuidReceived(uuid))
            }
            ("PUT", "/v1/message") => {
                let envelope = EncryptedEnvelope::from_wire_bytes(body)
                    .map_err(|e| ChannelError::InvalidFrame(format!("bad envelope body: {}", e)))?;

                self.acknowledge(request.id, 200, "OK")?;
                debug!("provisioning envelope received");
                Ok(ChannelEvent::EnvelopeReceived(envelope))
            }
            _ => {
                warn!(verb, path, "unsupported request on provisioning channel");
                self.acknowledge(request.id, 400, "Bad Request")?;
                Err(ChannelError::ProtocolViolation(format!("{} {}", verb, path)))
            }
        }
    }

    fn acknowledge(&mut self, id: Option<u64>, status: u32, message: &str) -> Result<(), ChannelError> {
        let response = ChannelResponse {
            id,
            status: Some(status),
            message: Some(message.to_string()),
            body: None,
        };
        self.transport.send_frame(&ChannelFrame::response(response))
    }
}
