// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! Injected store capabilities for the device list and the small set of
//! persisted flags. The traits are the contract this crate depends on;
//! the SQLite implementations are reference collaborators, and the
//! in-memory ones back tests.

mod device_store;
mod error;
mod kv;

pub use device_store::{DeviceStore, InMemoryDeviceStore, SqliteDeviceStore};
pub use error::StorageError;
pub use kv::{InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore};
