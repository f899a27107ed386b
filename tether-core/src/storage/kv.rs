// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Key-Value Flag Store
//!
//! Single-key reads and writes for the persisted provisioning flags: the
//! permanent kill-switch, the last-refresh timestamp, and the sync-message
//! observations. Injected as a capability; there is no ambient singleton.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::error::StorageError;

/// Injected key-value capability.
///
/// Each write is one write transaction; no additional locking is required
/// beyond the store's own discipline.
pub trait KeyValueStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn put_string(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        Ok(self.get_string(key)?.map(|v| v == "1"))
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.put_string(key, if value { "1" } else { "0" })
    }

    fn get_u64(&self, key: &str) -> Result<Option<u64>, StorageError> {
        self.get_string(key)?
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|e| StorageError::Serialization(format!("bad u64 for {}: {}", key, e)))
            })
            .transpose()
    }

    fn put_u64(&self, key: &str, value: u64) -> Result<(), StorageError> {
        self.put_string(key, &value.to_string())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_string(key)
    }

    fn put_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).put_string(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// SQLite-backed key-value store.
pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
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
            "CREATE TABLE IF NOT EXISTS key_value (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(SqliteKeyValueStore { conn })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM key_value WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO key_value (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM key_value WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-memory key-value store for tests.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().expect("kv lock poisoned").get(key).cloned())
    }

    fn put_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .expect("kv lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().expect("kv lock poisoned").remove(key);
        Ok(())
    }
}
