// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Link-and-sync coordinator tests: both role state machines against a
//! scripted linking API, including the timeout composition budget.

#![cfg(feature = "link-and-sync")]

use std::sync::Mutex;
use std::time::Duration;

use tether_core::devices::LinkedDeviceRecord;
use tether_core::linksync::{
    ArchiveLocation, ArchiveWaitResult, BackupError, BackupProducer, BackupRestorer,
    LinkAndSyncCoordinator, LinkSyncTimeouts, LinkWaitResult, LinkingApi, LinkingApiError,
    PrimaryLinkSyncError, SecondaryLinkSyncError,
};
use tether_core::provisioning::EphemeralBackupKey;

/// Short budget so tests finish quickly: 50 ms server, 50 ms grace.
fn short_timeouts() -> LinkSyncTimeouts {
    LinkSyncTimeouts {
        server_timeout: Duration::from_millis(50),
        client_grace: Duration::from_millis(50),
    }
}

fn linked_device() -> LinkedDeviceRecord {
    LinkedDeviceRecord {
        id: 2,
        name: None,
        created_ms: 1_700_000_000_000,
        last_seen_ms: 1_700_000_000_000,
    }
}

fn archive() -> ArchiveLocation {
    ArchiveLocation {
        cdn: 3,
        key: "archives/abc123".to_string(),
    }
}

/// Scripted linking API. `delay` is applied before each wait response to
/// model server-side hold time.
struct MockLinkingApi {
    delay: Duration,
    link_result: Result<LinkWaitResult, LinkingApiError>,
    archive_result: Result<ArchiveWaitResult, LinkingApiError>,
    set_archive_result: Result<(), LinkingApiError>,
    announced: Mutex<Vec<(u32, u64, ArchiveLocation)>>,
    requested_timeouts: Mutex<Vec<Duration>>,
}

impl MockLinkingApi {
    fn new() -> Self {
        MockLinkingApi {
            delay: Duration::ZERO,
            link_result: Ok(LinkWaitResult::Linked(linked_device())),
            archive_result: Ok(ArchiveWaitResult::Uploaded(archive())),
            set_archive_result: Ok(()),
            announced: Mutex::new(Vec::new()),
            requested_timeouts: Mutex::new(Vec::new()),
        }
    }
}

impl LinkingApi for MockLinkingApi {
    async fn wait_for_linked_device(
        &self,
        _token: &str,
        timeout: Duration,
    ) -> Result<LinkWaitResult, LinkingApiError> {
        self.requested_timeouts.lock().unwrap().push(timeout);
        tokio::time::sleep(self.delay).await;
        self.link_result.clone()
    }

    async fn set_transfer_archive(
        &self,
        destination_device_id: u32,
        destination_created_ms: u64,
        archive: &ArchiveLocation,
    ) -> Result<(), LinkingApiError> {
        self.announced.lock().unwrap().push((
            destination_device_id,
            destination_created_ms,
            archive.clone(),
        ));
        self.set_archive_result.clone()
    }

    async fn wait_for_transfer_archive(
        &self,
        timeout: Duration,
    ) -> Result<ArchiveWaitResult, LinkingApiError> {
        self.requested_timeouts.lock().unwrap().push(timeout);
        tokio::time::sleep(self.delay).await;
        self.archive_result.clone()
    }
}

/// Backup collaborator that records calls and fails on demand.
struct MockBackups {
    produce_result: Result<ArchiveLocation, BackupError>,
    restore_result: Result<(), BackupError>,
    restored: Mutex<Vec<(ArchiveLocation, [u8; 32])>>,
}

impl MockBackups {
    fn new() -> Self {
        MockBackups {
            produce_result: Ok(archive()),
            restore_result: Ok(()),
            restored: Mutex::new(Vec::new()),
        }
    }
}

impl BackupProducer for MockBackups {
    async fn create_and_upload(
        &self,
        _key: &EphemeralBackupKey,
    ) -> Result<ArchiveLocation, BackupError> {
        self.produce_result.clone()
    }
}

impl BackupRestorer for MockBackups {
    async fn download_and_restore(
        &self,
        location: &ArchiveLocation,
        key: &EphemeralBackupKey,
    ) -> Result<(), BackupError> {
        self.restored
            .lock()
            .unwrap()
            .push((location.clone(), *key.as_bytes()));
        self.restore_result.clone()
    }
}

#[test]
fn key_generation_is_gated_by_role_and_feature() {
    let enabled = LinkAndSyncCoordinator::new(MockLinkingApi::new());
    assert!(enabled.generate_ephemeral_backup_key().is_some());

    let disabled = LinkAndSyncCoordinator::new(MockLinkingApi::new()).with_enabled(false);
    assert!(disabled.generate_ephemeral_backup_key().is_none());

    let secondary = LinkAndSyncCoordinator::new(MockLinkingApi::new()).with_primary_role(false);
    assert!(secondary.generate_ephemeral_backup_key().is_none());
}

#[tokio::test]
async fn primary_happy_path_uploads_and_announces() {
    let coordinator =
        LinkAndSyncCoordinator::new(MockLinkingApi::new()).with_timeouts(short_timeouts());
    let key = coordinator.generate_ephemeral_backup_key().unwrap();
    let backups = MockBackups::new();

    let device = coordinator
        .wait_for_linking_and_upload(&key, "token-1", &backups)
        .await
        .unwrap();

    assert_eq!(device, linked_device());
}

#[tokio::test]
async fn primary_announces_destination_and_location() {
    let api = MockLinkingApi::new();
    let coordinator = LinkAndSyncCoordinator::new(&api).with_timeouts(short_timeouts());
    let key = EphemeralBackupKey::generate();

    coordinator
        .wait_for_linking_and_upload(&key, "token-1", &MockBackups::new())
        .await
        .unwrap();

    let announced = api.announced.lock().unwrap();
    assert_eq!(announced.len(), 1);
    let (device_id, created_ms, location) = &announced[0];
    assert_eq!(*device_id, linked_device().id);
    assert_eq!(*created_ms, linked_device().created_ms);
    assert_eq!(*location, archive());
}

#[tokio::test]
async fn server_side_timeout_is_retryable_timeout_kind() {
    let mut api = MockLinkingApi::new();
    api.link_result = Ok(LinkWaitResult::Timeout);

    let coordinator = LinkAndSyncCoordinator::new(api).with_timeouts(short_timeouts());
    let result = coordinator
        .wait_for_linking_and_upload(
            &EphemeralBackupKey::generate(),
            "token-1",
            &MockBackups::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(PrimaryLinkSyncError::TimedOutWaitingForLinkedDevice)
    ));
}

/// A response arriving just past the server timeout but inside the grace
/// window must not be treated as a client timeout.
#[tokio::test]
async fn response_within_grace_window_is_not_a_client_timeout() {
    let mut api = MockLinkingApi::new();
    // Server answers 10 ms after its own 50 ms budget.
    api.delay = Duration::from_millis(60);

    let coordinator = LinkAndSyncCoordinator::new(api).with_timeouts(short_timeouts());
    let device = coordinator
        .wait_for_linking_and_upload(
            &EphemeralBackupKey::generate(),
            "token-1",
            &MockBackups::new(),
        )
        .await
        .unwrap();

    assert_eq!(device.id, 2);
}

#[tokio::test]
async fn response_past_the_full_budget_is_a_client_timeout() {
    let mut api = MockLinkingApi::new();
    // Past server timeout + grace (100 ms total).
    api.delay = Duration::from_millis(200);

    let coordinator = LinkAndSyncCoordinator::new(api).with_timeouts(short_timeouts());
    let result = coordinator
        .wait_for_linking_and_upload(
            &EphemeralBackupKey::generate(),
            "token-1",
            &MockBackups::new(),
        )
        .await;

    assert!(matches!(
        result,
        Err(PrimaryLinkSyncError::TimedOutWaitingForLinkedDevice)
    ));
}

#[tokio::test]
async fn wait_requests_carry_the_server_timeout() {
    let api = MockLinkingApi::new();
    let timeouts = short_timeouts();
    let coordinator = LinkAndSyncCoordinator::new(&api).with_timeouts(timeouts);

    coordinator
        .wait_for_linking_and_upload(
            &EphemeralBackupKey::generate(),
            "token-1",
            &MockBackups::new(),
        )
        .await
        .unwrap();

    // The server was asked to hold for exactly the server-side timeout;
    // the client-side deadline adds the grace on top.
    assert_eq!(
        *api.requested_timeouts.lock().unwrap(),
        vec![timeouts.server_timeout]
    );
    assert_eq!(
        timeouts.client_deadline(),
        timeouts.server_timeout + timeouts.client_grace
    );
}

#[tokio::test]
async fn network_failure_is_its_own_kind() {
    let mut api = MockLinkingApi::new();
    api.link_result = Err(LinkingApiError::Network("connection reset".into()));

    let coordinator = LinkAndSyncCoordinator::new(api).with_timeouts(short_timeouts());
    let result = coordinator
        .wait_for_linking_and_upload(
            &EphemeralBackupKey::generate(),
            "token-1",
            &MockBackups::new(),
        )
        .await;

    assert!(matches!(result, Err(PrimaryLinkSyncError::Network(_))));
}

#[tokio::test]
async fn backup_generation_failure_kind() {
    let mut backups = MockBackups::new();
    backups.produce_result = Err(BackupError::Generation("disk full".into()));

    let coordinator =
        LinkAndSyncCoordinator::new(MockLinkingApi::new()).with_timeouts(short_timeouts());
    let result = coordinator
        .wait_for_linking_and_upload(&EphemeralBackupKey::generate(), "token-1", &backups)
        .await;

    assert!(matches!(
        result,
        Err(PrimaryLinkSyncError::ErrorGeneratingBackup(_))
    ));
}

#[tokio::test]
async fn backup_upload_failure_kind() {
    let mut backups = MockBackups::new();
    backups.produce_result = Err(BackupError::Upload("cdn unavailable".into()));

    let coordinator =
        LinkAndSyncCoordinator::new(MockLinkingApi::new()).with_timeouts(short_timeouts());
    let result = coordinator
        .wait_for_linking_and_upload(&EphemeralBackupKey::generate(), "token-1", &backups)
        .await;

    assert!(matches!(
        result,
        Err(PrimaryLinkSyncError::ErrorUploadingBackup(_))
    ));
}

#[tokio::test]
async fn secondary_happy_path_restores_under_the_key() {
    let coordinator = LinkAndSyncCoordinator::new(MockLinkingApi::new())
        .with_primary_role(false)
        .with_timeouts(short_timeouts());
    let key = EphemeralBackupKey::generate();
    let backups = MockBackups::new();

    coordinator
        .wait_for_backup_and_restore(&key, &backups)
        .await
        .unwrap();

    let restored = backups.restored.lock().unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].0, archive());
    assert_eq!(&restored[0].1, key.as_bytes());
}

#[tokio::test]
async fn secondary_timeout_and_error_kinds() {
    // Server-side timeout.
    let mut api = MockLinkingApi::new();
    api.archive_result = Ok(ArchiveWaitResult::Timeout);
    let coordinator = LinkAndSyncCoordinator::new(api)
        .with_primary_role(false)
        .with_timeouts(short_timeouts());
    let result = coordinator
        .wait_for_backup_and_restore(&EphemeralBackupKey::generate(), &MockBackups::new())
        .await;
    assert!(matches!(
        result,
        Err(SecondaryLinkSyncError::TimedOutWaitingForBackup)
    ));

    // Download failure.
    let mut backups = MockBackups::new();
    backups.restore_result = Err(BackupError::Download("404".into()));
    let coordinator = LinkAndSyncCoordinator::new(MockLinkingApi::new())
        .with_primary_role(false)
        .with_timeouts(short_timeouts());
    let result = coordinator
        .wait_for_backup_and_restore(&EphemeralBackupKey::generate(), &backups)
        .await;
    assert!(matches!(
        result,
        Err(SecondaryLinkSyncError::ErrorDownloadingBackup(_))
    ));

    // Restore failure.
    let mut backups = MockBackups::new();
    backups.restore_result = Err(BackupError::Restore("corrupt".into()));
    let coordinator = LinkAndSyncCoordinator::new(MockLinkingApi::new())
        .with_primary_role(false)
        .with_timeouts(short_timeouts());
    let result = coordinator
        .wait_for_backup_and_restore(&EphemeralBackupKey::generate(), &backups)
        .await;
    assert!(matches!(
        result,
        Err(SecondaryLinkSyncError::ErrorRestoringBackup(_))
    ));
}
