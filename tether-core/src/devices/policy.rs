// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device Lifecycle Policy
//!
//! Determines which linked device is least active and at risk of expiring,
//! gates the periodic device-list refresh, and owns the permanent
//! kill-switch. Pure over a device-list snapshot plus two durations derived
//! from the server-controlled message retention duration.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::info;

use super::manager::{DeviceListRefresher, DeviceManagerError};
use super::record::{LinkedDeviceRecord, PRIMARY_DEVICE_ID};
use crate::storage::{KeyValueStore, StorageError};

/// Device-list refreshes run at most once per this interval.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Grace subtracted from the retention duration to form the inactivity
/// threshold, so a device is flagged a week before it would expire.
const INACTIVITY_GRACE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Permanent kill-switch flag; once set it is never cleared in production.
const KEY_FINDER_DISABLED: &str = "devices.inactive_finder_disabled";

/// Epoch-milliseconds of the last completed device-list refresh.
const KEY_LAST_REFRESH_MS: &str = "devices.last_refresh_at_ms";

/// The activity window derived from the remote-configured message
/// retention duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    retention: Duration,
}

impl ActivityWindow {
    /// Builds a window from the server-controlled retention duration.
    pub fn new(retention: Duration) -> Self {
        ActivityWindow { retention }
    }

    /// A device not seen for this long counts as inactive.
    pub fn inactivity_threshold(&self) -> Duration {
        self.retention.saturating_sub(INACTIVITY_GRACE)
    }

    /// An inactive device expires this long after it was last seen.
    pub fn expiration_offset(&self) -> Duration {
        self.retention
    }
}

/// A linked device at risk of expiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactiveLinkedDevice {
    /// The device's (encrypted or legacy) display name, if any.
    pub name: Option<String>,
    /// When the device will expire.
    pub expires_at: SystemTime,
}

/// Outcome of a gated refresh attempt. The short-circuits are well-defined
/// no-ops, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    NotPrimary,
    Disabled,
    NotDue,
}

/// Errors from a gated refresh.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Refresh(#[from] DeviceManagerError),
}

/// Policy over a device-list snapshot.
pub struct DeviceLifecyclePolicy<K: KeyValueStore> {
    kv: K,
    is_primary: bool,
    window: ActivityWindow,
}

impl<K: KeyValueStore> DeviceLifecyclePolicy<K> {
    /// Creates a policy. `is_primary` is whether the local device is the
    /// account's primary device.
    pub fn new(kv: K, is_primary: bool, window: ActivityWindow) -> Self {
        DeviceLifecyclePolicy {
            kv,
            is_primary,
            window,
        }
    }

    /// Finds the least active linked device that has crossed the
    /// inactivity threshold.
    ///
    /// Returns `None` unconditionally when the kill-switch is set or the
    /// local device is not the primary. Ties on `last_seen` break to the
    /// lowest device id, so the result is deterministic.
    pub fn find_least_active(
        &self,
        snapshot: &[LinkedDeviceRecord],
        now: SystemTime,
    ) -> Result<Option<InactiveLinkedDevice>, StorageError> {
        if !self.is_primary || self.is_permanently_disabled()? {
            return Ok(None);
        }

        let threshold_ms = self.window.inactivity_threshold().as_millis() as u64;
        let now_ms = epoch_ms(now);

        let least_active = snapshot
            .iter()
            .filter(|d| d.id != PRIMARY_DEVICE_ID)
            .filter(|d| d.last_seen_ms.saturating_add(threshold_ms) < now_ms)
            .min_by_key(|d| (d.last_seen_ms, d.id));

        Ok(least_active.map(|d| InactiveLinkedDevice {
            name: d.name.clone(),
            expires_at: UNIX_EPOCH
                + Duration::from_millis(d.last_seen_ms)
                + self.window.expiration_offset(),
        }))
    }

    /// Triggers a device-list refresh at most once per [`REFRESH_INTERVAL`]
    /// and only when running as the primary device. Secondary role and the
    /// kill-switch are no-ops, not errors.
    pub async fn refresh_if_necessary<R: DeviceListRefresher>(
        &self,
        refresher: &R,
        now: SystemTime,
    ) -> Result<RefreshOutcome, RefreshError> {
        if !self.is_primary {
            return Ok(RefreshOutcome::NotPrimary);
        }
        if self.is_permanently_disabled()? {
            return Ok(RefreshOutcome::Disabled);
        }

        let now_ms = epoch_ms(now);
        if let Some(last_ms) = self.kv.get_u64(KEY_LAST_REFRESH_MS)? {
            let interval_ms = REFRESH_INTERVAL.as_millis() as u64;
            if now_ms < last_ms.saturating_add(interval_ms) {
                return Ok(RefreshOutcome::NotDue);
            }
        }

        refresher.refresh_devices().await?;
        self.kv.put_u64(KEY_LAST_REFRESH_MS, now_ms)?;
        Ok(RefreshOutcome::Refreshed)
    }

    /// Whether the permanent kill-switch is set.
    pub fn is_permanently_disabled(&self) -> Result<bool, StorageError> {
        Ok(self.kv.get_bool(KEY_FINDER_DISABLED)?.unwrap_or(false))
    }

    /// Sets the permanent kill-switch. Irreversible for the lifetime of
    /// the install.
    pub fn permanently_disable(&self) -> Result<(), StorageError> {
        info!("permanently disabling inactive-device finding");
        self.kv.put_bool(KEY_FINDER_DISABLED, true)
    }

    /// Clears the kill-switch. Test builds only.
    #[cfg(any(test, feature = "testing"))]
    pub fn reenable_for_tests(&self) -> Result<(), StorageError> {
        self.kv.remove(KEY_FINDER_DISABLED)
    }
}

fn epoch_ms(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_millis() as u64
}

// INLINE_TEST_REQUIRED: Exercises the private threshold arithmetic and KV keys
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryKeyValueStore;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn device(id: u32, last_seen: SystemTime) -> LinkedDeviceRecord {
        LinkedDeviceRecord {
            id,
            name: Some(format!("device-{}", id)),
            created_ms: 0,
            last_seen_ms: epoch_ms(last_seen),
        }
    }

    fn policy(is_primary: bool) -> DeviceLifecyclePolicy<InMemoryKeyValueStore> {
        DeviceLifecyclePolicy::new(
            InMemoryKeyValueStore::new(),
            is_primary,
            ActivityWindow::new(30 * DAY),
        )
    }

    #[test]
    fn test_window_durations() {
        let window = ActivityWindow::new(30 * DAY);
        assert_eq!(window.inactivity_threshold(), 23 * DAY);
        assert_eq!(window.expiration_offset(), 30 * DAY);

        // Retention shorter than the grace floors at zero.
        let short = ActivityWindow::new(3 * DAY);
        assert_eq!(short.inactivity_threshold(), Duration::ZERO);
    }

    #[test]
    fn test_least_active_selection_worked_example() {
        // R = 30d so the threshold is 23d: a device idle 40d qualifies,
        // one idle 10d does not.
        let now = SystemTime::now();
        let idle_40d = device(2, now - 40 * DAY);
        let idle_10d = device(3, now - 10 * DAY);

        let policy = policy(true);
        let found = policy
            .find_least_active(&[idle_40d.clone(), idle_10d], now)
            .unwrap()
            .expect("device 2 should qualify");

        assert_eq!(found.name.as_deref(), Some("device-2"));
        assert_eq!(
            found.expires_at,
            UNIX_EPOCH + Duration::from_millis(idle_40d.last_seen_ms) + 30 * DAY
        );
    }

    #[test]
    fn test_no_device_past_threshold_returns_none() {
        let now = SystemTime::now();
        let policy = policy(true);

        let result = policy
            .find_least_active(&[device(2, now - 10 * DAY)], now)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_primary_device_never_selected() {
        let now = SystemTime::now();
        let policy = policy(true);

        let result = policy
            .find_least_active(&[device(PRIMARY_DEVICE_ID, now - 100 * DAY)], now)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_minimum_last_seen_wins() {
        let now = SystemTime::now();
        let policy = policy(true);

        let found = policy
            .find_least_active(
                &[device(2, now - 40 * DAY), device(3, now - 50 * DAY)],
                now,
            )
            .unwrap()
            .unwrap();
        assert_eq!(found.name.as_deref(), Some("device-3"));
    }

    #[test]
    fn test_tie_breaks_to_lowest_id() {
        let now = SystemTime::now();
        let when = now - 40 * DAY;
        let policy = policy(true);

        let found = policy
            .find_least_active(&[device(7, when), device(4, when)], now)
            .unwrap()
            .unwrap();
        assert_eq!(found.name.as_deref(), Some("device-4"));
    }

    #[test]
    fn test_secondary_role_short_circuits() {
        let now = SystemTime::now();
        let policy = policy(false);

        let result = policy
            .find_least_active(&[device(2, now - 100 * DAY)], now)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_kill_switch_is_permanent() {
        let now = SystemTime::now();
        let policy = policy(true);
        let qualifying = [device(2, now - 100 * DAY)];

        assert!(policy.find_least_active(&qualifying, now).unwrap().is_some());

        policy.permanently_disable().unwrap();
        assert!(policy.is_permanently_disabled().unwrap());
        assert!(policy.find_least_active(&qualifying, now).unwrap().is_none());

        // Still disabled for any later snapshot.
        let later = now + 10 * DAY;
        assert!(policy
            .find_least_active(&qualifying, later)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_reenable_for_tests_clears_switch() {
        let now = SystemTime::now();
        let policy = policy(true);
        let qualifying = [device(2, now - 100 * DAY)];

        policy.permanently_disable().unwrap();
        policy.reenable_for_tests().unwrap();
        assert!(policy.find_least_active(&qualifying, now).unwrap().is_some());
    }
}
