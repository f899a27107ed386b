// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Linked Device Records
//!
//! The account's view of one attached device. Records are owned by the
//! device list and replaced wholesale on refresh, never patched.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// The primary device reserves id 1 by convention.
pub const PRIMARY_DEVICE_ID: u32 = 1;

/// One linked device as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedDeviceRecord {
    /// Device id; the primary device is id 1.
    pub id: u32,
    /// Encrypted display name (base64 of the name-cipher proto), or a
    /// legacy plaintext name, or absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Creation time, milliseconds since epoch.
    #[serde(rename = "created")]
    pub created_ms: u64,
    /// Last activity time, milliseconds since epoch.
    #[serde(rename = "lastSeen")]
    pub last_seen_ms: u64,
}

/// Raw shape of a device entry before id validation.
#[derive(Deserialize)]
struct RawDevice {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    created: u64,
    #[serde(rename = "lastSeen")]
    last_seen: u64,
}

impl RawDevice {
    fn validate(self) -> Option<LinkedDeviceRecord> {
        if self.id < 1 {
            warn!(id = self.id, "dropping device with invalid id");
            return None;
        }
        Some(LinkedDeviceRecord {
            id: self.id as u32,
            name: self.name,
            created_ms: self.created,
            last_seen_ms: self.last_seen,
        })
    }
}

/// Parses the device-list response body. Entries with ids < 1 are invalid
/// and dropped.
pub fn parse_device_list(json: &str) -> Result<Vec<LinkedDeviceRecord>, serde_json::Error> {
    let raw: Vec<RawDevice> = serde_json::from_str(json)?;
    Ok(raw.into_iter().filter_map(RawDevice::validate).collect())
}

/// Parses a single device entry; `None` when the id is invalid.
pub fn parse_device(json: &str) -> Result<Option<LinkedDeviceRecord>, serde_json::Error> {
    let raw: RawDevice = serde_json::from_str(json)?;
    Ok(raw.validate())
}
