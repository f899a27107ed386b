// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Protocol Messages
//!
//! Protobuf definitions for the provisioning payloads and the framed
//! real-time channel. Field numbers are part of the wire contract with
//! older and newer peers and must never be reassigned.

mod channel;
mod provisioning;

pub use channel::{ChannelFrame, ChannelRequest, ChannelResponse, FrameType};
pub use provisioning::{
    BackupTier, DeviceName, DevicePlatform, ProvisionEnvelope, ProvisionMessage,
    ProvisioningAddress, RegistrationProvisionMessage,
};
