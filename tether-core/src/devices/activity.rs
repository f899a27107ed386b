// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Activity Observations
//!
//! Small persisted observations about linking and sync traffic, written as
//! single-key updates to the injected key-value store.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, StorageError};

const KEY_MOST_RECENTLY_LINKED: &str = "devices.most_recently_linked";
const KEY_LAST_SYNC_MESSAGE_MS: &str = "devices.last_sync_message_at_ms";

/// Record of the most recent successful link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostRecentlyLinked {
    /// When the device linked, milliseconds since epoch.
    pub linked_at_ms: u64,
    /// Delay before notifying the user about the new device.
    pub notification_delay_ms: u64,
}

/// Tracks linking and sync-message observations.
pub struct DeviceActivityTracker<K: KeyValueStore> {
    kv: K,
}

impl<K: KeyValueStore> DeviceActivityTracker<K> {
    pub fn new(kv: K) -> Self {
        DeviceActivityTracker { kv }
    }

    /// Records a successful link.
    pub fn set_most_recently_linked(
        &self,
        record: &MostRecentlyLinked,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(record)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.put_string(KEY_MOST_RECENTLY_LINKED, &json)
    }

    /// Returns the most recent link record, if any.
    pub fn most_recently_linked(&self) -> Result<Option<MostRecentlyLinked>, StorageError> {
        self.kv
            .get_string(KEY_MOST_RECENTLY_LINKED)?
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .transpose()
    }

    /// Records that a sync message was received at `now`.
    pub fn record_sync_message(&self, now: SystemTime) -> Result<(), StorageError> {
        let now_ms = now
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX epoch")
            .as_millis() as u64;
        self.kv.put_u64(KEY_LAST_SYNC_MESSAGE_MS, now_ms)
    }

    /// Milliseconds-since-epoch of the last received sync message.
    pub fn last_sync_message_at_ms(&self) -> Result<Option<u64>, StorageError> {
        self.kv.get_u64(KEY_LAST_SYNC_MESSAGE_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryKeyValueStore;

    #[test]
    fn test_most_recently_linked_roundtrip() {
        let tracker = DeviceActivityTracker::new(InMemoryKeyValueStore::new());
        assert_eq!(tracker.most_recently_linked().unwrap(), None);

        let record = MostRecentlyLinked {
            linked_at_ms: 1_700_000_000_000,
            notification_delay_ms: 60_000,
        };
        tracker.set_most_recently_linked(&record).unwrap();
        assert_eq!(tracker.most_recently_linked().unwrap(), Some(record));
    }

    #[test]
    fn test_sync_message_timestamp() {
        let tracker = DeviceActivityTracker::new(InMemoryKeyValueStore::new());
        assert_eq!(tracker.last_sync_message_at_ms().unwrap(), None);

        let now = SystemTime::now();
        tracker.record_sync_message(now).unwrap();

        let stored = tracker.last_sync_message_at_ms().unwrap().unwrap();
        let now_ms = now
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        assert_eq!(stored, now_ms);
    }
}
