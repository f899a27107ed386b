// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Linked Device Store
//!
//! The device list is replaced wholesale on each refresh; the existing set
//! is deleted and the new set inserted within one transaction, so readers
//! never observe a partial list. Callers serialize concurrent refreshes
//! themselves.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::error::StorageError;
use crate::devices::LinkedDeviceRecord;

/// Injected device-list capability.
pub trait DeviceStore {
    /// Replaces the whole device list atomically.
    fn replace_all(&self, devices: &[LinkedDeviceRecord]) -> Result<(), StorageError>;

    /// Returns the stored device list, ordered by device id.
    fn list(&self) -> Result<Vec<LinkedDeviceRecord>, StorageError>;
}

impl<T: DeviceStore + ?Sized> DeviceStore for &T {
    fn replace_all(&self, devices: &[LinkedDeviceRecord]) -> Result<(), StorageError> {
        (**self).replace_all(devices)
    }

    fn list(&self) -> Result<Vec<LinkedDeviceRecord>, StorageError> {
        (**self).list()
    }
}

/// SQLite-backed device store.
pub struct SqliteDeviceStore {
    conn: Connection,
}

impl SqliteDeviceStore {
    /// Opens or creates a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Creates an in-memory store (useful for tests and tools).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS linked_devices (
                id INTEGER PRIMARY KEY,
                name TEXT,
                created_ms INTEGER NOT NULL,
                last_seen_ms INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(SqliteDeviceStore { conn })
    }
}

impl DeviceStore for SqliteDeviceStore {
    fn replace_all(&self, devices: &[LinkedDeviceRecord]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM linked_devices", [])?;
        for device in devices {
            tx.execute(
                "INSERT INTO linked_devices (id, name, created_ms, last_seen_ms)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    device.id as i64,
                    device.name,
                    device.created_ms as i64,
                    device.last_seen_ms as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<LinkedDeviceRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, created_ms, last_seen_ms FROM linked_devices ORDER BY id",
        )?;

        let devices = stmt
            .query_map([], |row| {
                Ok(LinkedDeviceRecord {
                    id: row.get::<_, i64>(0)? as u32,
                    name: row.get::<_, Option<String>>(1)?,
                    created_ms: row.get::<_, i64>(2)? as u64,
                    last_seen_ms: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(devices)
    }
}

/// In-memory device store for tests.
#[derive(Default)]
pub struct InMemoryDeviceStore {
    devices: Mutex<Vec<LinkedDeviceRecord>>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStore for InMemoryDeviceStore {
    fn replace_all(&self, devices: &[LinkedDeviceRecord]) -> Result<(), StorageError> {
        let mut sorted = devices.to_vec();
        sorted.sort_by_key(|d| d.id);
        *self.devices.lock().expect("device lock poisoned") = sorted;
        Ok(())
    }

    fn list(&self) -> Result<Vec<LinkedDeviceRecord>, StorageError> {
        Ok(self.devices.lock().expect("device lock poisoned").clone())
    }
}
