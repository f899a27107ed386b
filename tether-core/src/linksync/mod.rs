// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Link-and-Sync Coordination
//!
//! The optional flow that, in addition to linking, transfers a full account
//! backup to the newly linked device. Two independent role state machines:
//! the primary waits for the link, produces and uploads the backup, then
//! marks it uploaded; the secondary waits for the upload notice, downloads,
//! and restores. Long-polls carry the server-side timeout as a query
//! parameter and add a client-side grace so clock skew never trips the
//! client before the server's own budget runs out.

#[cfg(feature = "http-api")]
mod http;

#[cfg(feature = "http-api")]
pub use http::HttpLinkingApi;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::devices::LinkedDeviceRecord;
use crate::provisioning::EphemeralBackupKey;

/// Server-side long-poll timeout.
pub const DEFAULT_SERVER_TIMEOUT: Duration = Duration::from_secs(60);

/// Client-side grace added on top of the server timeout.
pub const DEFAULT_CLIENT_GRACE: Duration = Duration::from_secs(30);

/// Long-poll timeout budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSyncTimeouts {
    /// Timeout the server is asked to hold the poll open for.
    pub server_timeout: Duration,
    /// Extra client-side allowance for clock skew and transit.
    pub client_grace: Duration,
}

impl Default for LinkSyncTimeouts {
    fn default() -> Self {
        LinkSyncTimeouts {
            server_timeout: DEFAULT_SERVER_TIMEOUT,
            client_grace: DEFAULT_CLIENT_GRACE,
        }
    }
}

impl LinkSyncTimeouts {
    /// The client-side deadline: server timeout plus grace.
    pub fn client_deadline(&self) -> Duration {
        self.server_timeout + self.client_grace
    }
}

/// Location of an uploaded transfer archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveLocation {
    /// CDN number the archive lives on.
    pub cdn: u32,
    /// Object key within the CDN.
    pub key: String,
}

/// Result of one `wait_for_linked_device` long-poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkWaitResult {
    /// The new device finished linking.
    Linked(LinkedDeviceRecord),
    /// The server's budget elapsed with no link; re-issue the poll.
    Timeout,
}

/// Result of one `wait_for_transfer_archive` long-poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveWaitResult {
    /// The primary uploaded the archive.
    Uploaded(ArchiveLocation),
    /// The server's budget elapsed; re-issue the poll.
    Timeout,
}

/// Errors from the linking API endpoints.
#[derive(Error, Debug, Clone)]
pub enum LinkingApiError {
    /// Transport failure; retryable, orthogonal to timeouts.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
}

/// The server endpoints used by the link-and-sync flow.
pub trait LinkingApi {
    /// `GET /v1/devices/wait_for_linked_device/{token}?timeout={seconds}`
    fn wait_for_linked_device(
        &self,
        token: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<LinkWaitResult, LinkingApiError>> + Send;

    /// `PUT /v1/devices/transfer_archive`
    fn set_transfer_archive(
        &self,
        destination_device_id: u32,
        destination_created_ms: u64,
        archive: &ArchiveLocation,
    ) -> impl std::future::Future<Output = Result<(), LinkingApiError>> + Send;

    /// `GET /v1/devices/transfer_archive?timeout={seconds}`
    fn wait_for_transfer_archive(
        &self,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<ArchiveWaitResult, LinkingApiError>> + Send;
}

impl<T: LinkingApi + Sync> LinkingApi for &T {
    fn wait_for_linked_device(
        &self,
        token: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<LinkWaitResult, LinkingApiError>> + Send {
        (**self).wait_for_linked_device(token, timeout)
    }

    fn set_transfer_archive(
        &self,
        destination_device_id: u32,
        destination_created_ms: u64,
        archive: &ArchiveLocation,
    ) -> impl std::future::Future<Output = Result<(), LinkingApiError>> + Send {
        (**self).set_transfer_archive(destination_device_id, destination_created_ms, archive)
    }

    fn wait_for_transfer_archive(
        &self,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<ArchiveWaitResult, LinkingApiError>> + Send {
        (**self).wait_for_transfer_archive(timeout)
    }
}

/// Backup collaborator errors, by stage.
#[derive(Error, Debug, Clone)]
pub enum BackupError {
    #[error("Backup generation failed: {0}")]
    Generation(String),

    #[error("Backup upload failed: {0}")]
    Upload(String),

    #[error("Backup download failed: {0}")]
    Download(String),

    #[error("Backup restore failed: {0}")]
    Restore(String),
}

/// Produces and uploads a backup encrypted under an ephemeral key.
/// Backup content generation itself is outside this crate.
pub trait BackupProducer {
    fn create_and_upload(
        &self,
        key: &EphemeralBackupKey,
    ) -> impl std::future::Future<Output = Result<ArchiveLocation, BackupError>> + Send;
}

/// Downloads and restores a backup encrypted under an ephemeral key.
pub trait BackupRestorer {
    fn download_and_restore(
        &self,
        location: &ArchiveLocation,
        key: &EphemeralBackupKey,
    ) -> impl std::future::Future<Output = Result<(), BackupError>> + Send;
}

/// Primary-role failures.
#[derive(Error, Debug, Clone)]
pub enum PrimaryLinkSyncError {
    /// Both the server and client budgets elapsed; retryable.
    #[error("Timed out waiting for the linked device")]
    TimedOutWaitingForLinkedDevice,

    #[error("Error waiting for the linked device: {0}")]
    ErrorWaitingForLinkedDevice(String),

    #[error("Error generating backup: {0}")]
    ErrorGeneratingBackup(String),

    #[error("Error uploading backup: {0}")]
    ErrorUploadingBackup(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Secondary-role failures.
#[derive(Error, Debug, Clone)]
pub enum SecondaryLinkSyncError {
    /// Both the server and client budgets elapsed; retryable.
    #[error("Timed out waiting for the backup")]
    TimedOutWaitingForBackup,

    #[error("Error waiting for the backup: {0}")]
    ErrorWaitingForBackup(String),

    #[error("Error downloading backup: {0}")]
    ErrorDownloadingBackup(String),

    #[error("Error restoring backup: {0}")]
    ErrorRestoringBackup(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Orchestrates the optional link-and-sync flow for either role.
///
/// Long-poll waits are cancellable by dropping the returned future; this
/// crate never retries on the caller's behalf.
pub struct LinkAndSyncCoordinator<A: LinkingApi> {
    api: A,
    timeouts: LinkSyncTimeouts,
    enabled: bool,
    is_primary: bool,
}

impl<A: LinkingApi> LinkAndSyncCoordinator<A> {
    /// Creates a coordinator with the default timeout budget, enabled, in
    /// the primary role.
    pub fn new(api: A) -> Self {
        LinkAndSyncCoordinator {
            api,
            timeouts: LinkSyncTimeouts::default(),
            enabled: true,
            is_primary: true,
        }
    }

    /// Feature-gates the flow off without changing call sites.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets whether the local device is the account's primary.
    pub fn with_primary_role(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    /// Overrides the timeout budget (tests and tuning).
    pub fn with_timeouts(mut self, timeouts: LinkSyncTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Returns a fresh ephemeral backup key, or `None` when the flow is
    /// disabled or this device is not the primary. Not an error; a policy
    /// short-circuit.
    pub fn generate_ephemeral_backup_key(&self) -> Option<EphemeralBackupKey> {
        if !self.enabled || !self.is_primary {
            return None;
        }
        Some(EphemeralBackupKey::generate())
    }

    /// Primary role: waits for the new device to finish linking, produces
    /// and uploads a backup under `key`, then marks it uploaded with the
    /// destination device's id and creation time.
    ///
    /// Returns the linked device record on success.
    pub async fn wait_for_linking_and_upload<B: BackupProducer>(
        &self,
        key: &EphemeralBackupKey,
        token: &str,
        backups: &B,
    ) -> Result<LinkedDeviceRecord, PrimaryLinkSyncError> {
        debug!(token, "waiting for linked device");

        let wait = self
            .api
            .wait_for_linked_device(token, self.timeouts.server_timeout);
        let device = match tokio::time::timeout(self.timeouts.client_deadline(), wait).await {
            Err(_) => return Err(PrimaryLinkSyncError::TimedOutWaitingForLinkedDevice),
            Ok(Ok(LinkWaitResult::Timeout)) => {
                return Err(PrimaryLinkSyncError::TimedOutWaitingForLinkedDevice)
            }
            Ok(Ok(LinkWaitResult::Linked(device))) => device,
            Ok(Err(LinkingApiError::Network(e))) => return Err(PrimaryLinkSyncError::Network(e)),
            Ok(Err(e)) => {
                return Err(PrimaryLinkSyncError::ErrorWaitingForLinkedDevice(
                    e.to_string(),
                ))
            }
        };

        info!(device_id = device.id, "device linked, producing backup");

        let archive = backups.create_and_upload(key).await.map_err(|e| match e {
            BackupError::Generation(m) => PrimaryLinkSyncError::ErrorGeneratingBackup(m),
            other => PrimaryLinkSyncError::ErrorUploadingBackup(other.to_string()),
        })?;

        self.api
            .set_transfer_archive(device.id, device.created_ms, &archive)
            .await
            .map_err(|e| match e {
                LinkingApiError::Network(m) => PrimaryLinkSyncError::Network(m),
                other => PrimaryLinkSyncError::ErrorUploadingBackup(other.to_string()),
            })?;

        info!(device_id = device.id, "backup uploaded and announced");
        Ok(device)
    }

    /// Secondary role: waits for the primary's upload notice, then
    /// downloads and restores the archive under `key`.
    pub async fn wait_for_backup_and_restore<B: BackupRestorer>(
        &self,
        key: &EphemeralBackupKey,
        backups: &B,
    ) -> Result<(), SecondaryLinkSyncError> {
        debug!("waiting for transfer archive");

        let wait = self
            .api
            .wait_for_transfer_archive(self.timeouts.server_timeout);
        let location = match tokio::time::timeout(self.timeouts.client_deadline(), wait).await {
            Err(_) => return Err(SecondaryLinkSyncError::TimedOutWaitingForBackup),
            Ok(Ok(ArchiveWaitResult::Timeout)) => {
                return Err(SecondaryLinkSyncError::TimedOutWaitingForBackup)
            }
            Ok(Ok(ArchiveWaitResult::Uploaded(location))) => location,
            Ok(Err(LinkingApiError::Network(e))) => {
                return Err(SecondaryLinkSyncError::Network(e))
            }
            Ok(Err(e)) => {
                return Err(SecondaryLinkSyncError::ErrorWaitingForBackup(e.to_string()))
            }
        };

        info!(cdn = location.cdn, "transfer archive announced, restoring");

        backups
            .download_and_restore(&location, key)
            .await
            .map_err(|e| match e {
                BackupError::Restore(m) => SecondaryLinkSyncError::ErrorRestoringBackup(m),
                other => SecondaryLinkSyncError::ErrorDownloadingBackup(other.to_string()),
            })?;

        info!("backup restored");
        Ok(())
    }
}
