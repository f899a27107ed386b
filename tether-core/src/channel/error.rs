// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Provisioning Channel Error Types

use thiserror::Error;

/// Errors that can occur on the provisioning channel.
#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    #[error("Channel is not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Failed to send frame: {0}")]
    SendFailed(String),

    #[error("Failed to receive frame: {0}")]
    ReceiveFailed(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Unexpected verb/path or a response frame where a request was
    /// expected. The channel survives; the frame is dropped.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}
