// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Frame Transport
//!
//! Real transport implementation using tungstenite for the provisioning
//! channel. Supports both native-tls and rustls TLS backends.

use std::net::TcpStream;
use std::time::Duration;

#[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
use native_tls::TlsConnector;

#[cfg(feature = "network-rustls")]
use rustls::pki_types::ServerName;
#[cfg(feature = "network-rustls")]
use std::sync::Arc;

use prost::Message as _;
use tungstenite::client::IntoClientRequest;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::error::ChannelError;
use super::transport::FrameTransport;
use crate::provisioning::PROVISIONING_USER_AGENT;
use crate::wire::ChannelFrame;

/// Configuration for the websocket frame transport.
#[derive(Clone, Debug)]
pub struct WebSocketTransportConfig {
    /// Base server URL (`ws://` or `wss://`).
    pub server_url: String,
    /// Agent string appended to the provisioning endpoint query.
    pub agent: String,
    /// Socket I/O timeout in milliseconds (connect-time default).
    pub io_timeout_ms: u64,
}

impl Default for WebSocketTransportConfig {
    fn default() -> Self {
        WebSocketTransportConfig {
            server_url: String::new(),
            agent: PROVISIONING_USER_AGENT.to_string(),
            io_timeout_ms: 5_000,
        }
    }
}

/// WebSocket transport for the provisioning channel.
///
/// Connects to `v1/websocket/provisioning/?agent=<agent>` and exchanges
/// prost-encoded [`ChannelFrame`]s as binary websocket messages.
pub struct WebSocketFrameTransport {
    socket: Option<WebSocket<MaybeTlsStream<TcpStream>>>,
    config: WebSocketTransportConfig,
}

impl WebSocketFrameTransport {
    /// Creates a new transport. No connection is made until `connect`.
    pub fn new(config: WebSocketTransportConfig) -> Self {
        WebSocketFrameTransport {
            socket: None,
            config,
        }
    }

    /// Parses a WebSocket URL into host, port, and TLS flag.
    fn parse_url(url: &str) -> Result<(String, u16, bool), ChannelError> {
        let is_tls = url.starts_with("wss://");
        let url_without_scheme = url
            .strip_prefix("wss://")
            .or_else(|| url.strip_prefix("ws://"))
            .ok_or_else(|| {
                ChannelError::ConnectionFailed(
                    "Invalid URL scheme (expected ws:// or wss://)".into(),
                )
            })?;

        let host_port = url_without_scheme
            .split('/')
            .next()
            .unwrap_or(url_without_scheme);

        let (host, port) = if let Some(colon_pos) = host_port.rfind(':') {
            let host = &host_port[..colon_pos];
            let port_str = &host_port[colon_pos + 1..];
            let port: u16 = port_str.parse().map_err(|_| {
                ChannelError::ConnectionFailed(format!("Invalid port: {}", port_str))
            })?;
            (host.to_string(), port)
        } else {
            let default_port = if is_tls { 443 } else { 80 };
            (host_port.to_string(), default_port)
        };

        Ok((host, port, is_tls))
    }

    /// The full provisioning endpoint URL.
    fn provisioning_url(&self) -> String {
        format!(
            "{}/v1/websocket/provisioning/?agent={}",
            self.config.server_url.trim_end_matches('/'),
            self.config.agent
        )
    }

    /// Create a TLS stream using native-tls
    #[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
    fn create_tls_stream(
        host: &str,
        tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, ChannelError> {
        let connector = TlsConnector::new()
            .map_err(|e| ChannelError::ConnectionFailed(format!("TLS error: {}", e)))?;
        let tls_stream = connector
            .connect(host, tcp_stream)
            .map_err(|e| ChannelError::ConnectionFailed(format!("TLS handshake failed: {}", e)))?;
        Ok(MaybeTlsStream::NativeTls(tls_stream))
    }

    /// Create a TLS stream using rustls
    #[cfg(feature = "network-rustls")]
    fn create_tls_stream(
        host: &str,
        tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, ChannelError> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let server_name: ServerName<'_> = host.try_into().map_err(|_| {
            ChannelError::ConnectionFailed(format!("Invalid server name: {}", host))
        })?;

        let tls_conn = rustls::ClientConnection::new(Arc::new(config), server_name.to_owned())
            .map_err(|e| ChannelError::ConnectionFailed(format!("TLS setup failed: {}", e)))?;

        let tls_stream = rustls::StreamOwned::new(tls_conn, tcp_stream);
        Ok(MaybeTlsStream::Rustls(tls_stream))
    }

    fn tcp_stream(&self) -> Option<&TcpStream> {
        match self.socket.as_ref()?.get_ref() {
            MaybeTlsStream::Plain(s) => Some(s),
            #[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
            MaybeTlsStream::NativeTls(s) => Some(s.get_ref()),
            #[cfg(feature = "network-rustls")]
            MaybeTlsStream::Rustls(s) => Some(s.get_ref()),
            _ => None,
        }
    }
}

impl FrameTransport for WebSocketFrameTransport {
    fn connect(&mut self) -> Result<(), ChannelError> {
        if self.socket.is_some() {
            return Ok(());
        }

        let url = self.provisioning_url();
        let (host, port, is_tls) = Self::parse_url(&url)?;
        let addr = format!("{}:{}", host, port);

        let tcp_stream = TcpStream::connect(&addr)
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        let io_timeout = Duration::from_millis(self.config.io_timeout_ms);
        tcp_stream
            .set_read_timeout(Some(io_timeout))
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
        tcp_stream
            .set_write_timeout(Some(io_timeout))
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        let stream: MaybeTlsStream<TcpStream> = if is_tls {
            Self::create_tls_stream(&host, tcp_stream)?
        } else {
            MaybeTlsStream::Plain(tcp_stream)
        };

        let request = url.as_str().into_client_request().map_err(|e| {
            ChannelError::ConnectionFailed(format!("Invalid WebSocket request: {}", e))
        })?;

        let (socket, _response) = tungstenite::client(request, stream).map_err(|e| {
            ChannelError::ConnectionFailed(format!("WebSocket handshake failed: {}", e))
        })?;

        self.socket = Some(socket);
        Ok(())
    }

    fn send_frame(&mut self, frame: &ChannelFrame) -> Result<(), ChannelError> {
        let encoded = frame.encode_to_vec();
        let socket = self.socket.as_mut().ok_or(ChannelError::NotConnected)?;

        socket.send(Message::Binary(encoded)).map_err(|e| {
            if matches!(
                e,
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
            ) {
                ChannelError::ConnectionClosed
            } else {
                ChannelError::SendFailed(e.to_string())
            }
        })?;

        socket
            .flush()
            .map_err(|e| ChannelError::SendFailed(format!("Flush failed: {}", e)))
    }

    fn recv_frame(&mut self, timeout: Duration) -> Result<Option<ChannelFrame>, ChannelError> {
        if self.socket.is_none() {
            return Err(ChannelError::NotConnected);
        }

        // A zero read timeout means "block forever" to the OS; clamp up.
        let timeout = timeout.max(Duration::from_millis(1));
        if let Some(stream) = self.tcp_stream() {
            stream
                .set_read_timeout(Some(timeout))
                .map_err(|e| ChannelError::ReceiveFailed(e.to_string()))?;
        }

        let socket = self.socket.as_mut().ok_or(ChannelError::NotConnected)?;
        match socket.read() {
            Ok(Message::Binary(data)) => {
                let frame = ChannelFrame::decode(data.as_slice())
                    .map_err(|e| ChannelError::InvalidFrame(e.to_string()))?;
                Ok(Some(frame))
            }
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
                Ok(None)
            }
            Ok(Message::Pong(_)) => Ok(None),
            Ok(Message::Close(_)) => Err(ChannelError::ConnectionClosed),
            Ok(Message::Text(_)) => Err(ChannelError::InvalidFrame(
                "Unexpected text message".into(),
            )),
            Ok(Message::Frame(_)) => Ok(None),
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Err(ChannelError::ConnectionClosed)
            }
            Err(e) => Err(ChannelError::ReceiveFailed(e.to_string())),
        }
    }

    fn send_ping(&mut self) -> Result<(), ChannelError> {
        let socket = self.socket.as_mut().ok_or(ChannelError::NotConnected)?;
        socket
            .send(Message::Ping(Vec::new()))
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        socket
            .flush()
            .map_err(|e| ChannelError::SendFailed(format!("Flush failed: {}", e)))
    }

    fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None); // Ignore errors on close
        }
    }
}
