// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Linked Device Manager
//!
//! Ties the device API, the device store, and the name cipher together:
//! refresh the local list from the server, read it back with decrypted
//! names, rename, and unlink.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;
use tracing::debug;

use super::api::{DeviceApi, DeviceApiError};
use super::record::LinkedDeviceRecord;
use crate::crypto::name_cipher::{decrypt_device_name, encrypt_device_name, NameCipherError};
use crate::crypto::IdentityKeyPair;
use crate::storage::{DeviceStore, StorageError};

/// Errors from device management operations.
#[derive(Error, Debug)]
pub enum DeviceManagerError {
    #[error(transparent)]
    Api(#[from] DeviceApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Integrity failure decrypting a device name. Distinct from the
    /// legacy-plaintext fallback, which is not an error.
    #[error(transparent)]
    Name(#[from] NameCipherError),
}

/// Something that can refresh the local device list from the server.
pub trait DeviceListRefresher {
    fn refresh_devices(
        &self,
    ) -> impl std::future::Future<Output = Result<usize, DeviceManagerError>> + Send;
}

/// A device record together with its decrypted display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedDevice {
    pub record: LinkedDeviceRecord,
    /// Decrypted name, or the raw legacy name when the stored value is not
    /// an encrypted proto, or `None` when the device has no name.
    pub display_name: Option<String>,
}

/// Management facade over the device API and store.
pub struct LinkedDeviceManager<A: DeviceApi, S: DeviceStore> {
    api: A,
    store: S,
}

impl<A: DeviceApi, S: DeviceStore> LinkedDeviceManager<A, S> {
    pub fn new(api: A, store: S) -> Self {
        LinkedDeviceManager { api, store }
    }

    /// Fetches the device list and replaces the stored one wholesale.
    /// Returns the number of devices stored.
    pub async fn refresh(&self) -> Result<usize, DeviceManagerError> {
        let devices = self.api.list_devices().await?;
        self.store.replace_all(&devices)?;
        debug!(count = devices.len(), "device list refreshed");
        Ok(devices.len())
    }

    /// Reads the stored device list and decrypts display names with the
    /// account identity key.
    ///
    /// Name values that are not parsable as an encrypted-name proto are
    /// passed through as legacy plaintext names; an integrity failure on a
    /// parsable one is surfaced.
    pub fn linked_devices(
        &self,
        identity: &IdentityKeyPair,
    ) -> Result<Vec<DecryptedDevice>, DeviceManagerError> {
        self.store
            .list()?
            .into_iter()
            .map(|record| {
                let display_name = decrypt_name_field(record.name.as_deref(), identity)?;
                Ok(DecryptedDevice {
                    record,
                    display_name,
                })
            })
            .collect()
    }

    /// Encrypts `new_name` under the identity key and renames the device.
    pub async fn rename(
        &self,
        id: u32,
        new_name: &str,
        identity: &IdentityKeyPair,
    ) -> Result<(), DeviceManagerError> {
        let encrypted = encrypt_device_name(new_name, identity);
        self.api.rename_device(id, &encrypted).await?;
        Ok(())
    }

    /// Unlinks the device from the account.
    pub async fn unlink(&self, id: u32) -> Result<(), DeviceManagerError> {
        self.api.unlink_device(id).await?;
        Ok(())
    }
}

impl<A, S> DeviceListRefresher for LinkedDeviceManager<A, S>
where
    A: DeviceApi + Sync,
    S: DeviceStore + Sync,
{
    async fn refresh_devices(&self) -> Result<usize, DeviceManagerError> {
        self.refresh().await
    }
}

fn decrypt_name_field(
    name: Option<&str>,
    identity: &IdentityKeyPair,
) -> Result<Option<String>, DeviceManagerError> {
    let raw = match name {
        None => return Ok(None),
        Some(raw) => raw,
    };

    let bytes = match BASE64.decode(raw) {
        // Not base64 at all: a legacy unencrypted name.
        Err(_) => return Ok(Some(raw.to_string())),
        Ok(bytes) => bytes,
    };

    match decrypt_device_name(&bytes, identity) {
        Ok(name) => Ok(Some(name)),
        // Valid base64 but not an encrypted-name proto: legacy name.
        Err(NameCipherError::InvalidInput) => Ok(Some(raw.to_string())),
        Err(e @ NameCipherError::CryptError) => Err(e.into()),
    }
}
