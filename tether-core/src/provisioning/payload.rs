// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Typed provisioning payloads.
//!
//! The plaintext structures carried inside an encrypted provisioning
//! envelope. All payloads are transient: constructed and consumed within a
//! single linking attempt, never persisted.

use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroize;

use crate::crypto::{IdentityKeyPair, Hkdf};
use crate::wire::{BackupTier, DevicePlatform};

/// Protocol version stamped on every encoded provisioning message.
pub const PROVISIONING_VERSION: u32 = 1;

/// User-agent constant embedded on encode when the payload carries none.
pub const PROVISIONING_USER_AGENT: &str = "Tether";

/// Length of a valid account entropy pool string.
pub const ENTROPY_POOL_LENGTH: usize = 64;

/// KDF info for deriving the master key from an entropy pool.
const MASTER_KEY_INFO: &[u8] = b"Tether Account Master Key";

/// Alphabet the entropy pool draws from (lowercase alphanumeric).
const ENTROPY_POOL_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Entropy pool validation error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid account entropy pool")]
pub struct EntropyPoolError;

/// A high-entropy account seed: 64 lowercase alphanumeric characters from
/// which the account master key is derivable.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountEntropyPool {
    value: String,
}

impl AccountEntropyPool {
    /// Validates and wraps an entropy pool string.
    pub fn parse(value: &str) -> Result<Self, EntropyPoolError> {
        if value.len() != ENTROPY_POOL_LENGTH {
            return Err(EntropyPoolError);
        }
        if !value
            .bytes()
            .all(|b| ENTROPY_POOL_ALPHABET.contains(&b))
        {
            return Err(EntropyPoolError);
        }
        Ok(AccountEntropyPool {
            value: value.to_string(),
        })
    }

    /// Generates a fresh random entropy pool.
    pub fn generate() -> Self {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; ENTROPY_POOL_LENGTH];
        rng.fill(&mut bytes).expect("System RNG should not fail");

        let value: String = bytes
            .iter()
            .map(|b| ENTROPY_POOL_ALPHABET[*b as usize % ENTROPY_POOL_ALPHABET.len()] as char)
            .collect();
        AccountEntropyPool { value }
    }

    /// Returns the pool string.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Derives the account master key from this pool.
    pub fn derive_master_key(&self) -> MasterKey {
        let key = Hkdf::derive_key(None, self.value.as_bytes(), MASTER_KEY_INFO);
        MasterKey::from_bytes(key)
    }
}

impl Drop for AccountEntropyPool {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

impl std::fmt::Debug for AccountEntropyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountEntropyPool")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Legacy 32-byte account master key.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterKey {
    bytes: [u8; 32],
}

impl MasterKey {
    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        MasterKey { bytes }
    }

    /// Returns a reference to the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Root key material: exactly one of the two generations is present per
/// provisioning message. Decoding tries the entropy pool first and only
/// falls back to the legacy master key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RootKeyMaterial {
    EntropyPool(AccountEntropyPool),
    MasterKey(MasterKey),
}

/// A fresh per-linking-attempt backup encryption key.
///
/// Never persisted beyond the linking session.
#[derive(Clone, PartialEq, Eq)]
pub struct EphemeralBackupKey {
    bytes: [u8; 32],
}

impl EphemeralBackupKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let rng = SystemRandom::new();
        let key = ring::rand::generate::<[u8; 32]>(&rng)
            .expect("System RNG should not fail")
            .expose();
        EphemeralBackupKey { bytes: key }
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        EphemeralBackupKey { bytes }
    }

    /// Returns a reference to the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl Drop for EphemeralBackupKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for EphemeralBackupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralBackupKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Plaintext payload for linking a secondary device to an existing account.
#[derive(Clone, PartialEq)]
pub struct ProvisioningPayload {
    /// Root key material (entropy pool or legacy master key).
    pub root_key: RootKeyMaterial,
    /// Account service identifier.
    pub account_id: Uuid,
    /// Privacy-identity service identifier.
    pub privacy_id: Uuid,
    /// Account phone number; never empty.
    pub number: String,
    /// Account identity key pair.
    pub account_identity: IdentityKeyPair,
    /// Privacy identity key pair.
    pub privacy_identity: IdentityKeyPair,
    /// Symmetric profile key.
    pub profile_key: [u8; 32],
    /// Media backup root key.
    pub media_backup_key: [u8; 32],
    /// Message-backup key for the optional link-and-sync flow.
    pub ephemeral_backup_key: Option<EphemeralBackupKey>,
    /// Whether the account sends read receipts.
    pub read_receipts: bool,
    /// One-time provisioning authorization code.
    pub provisioning_code: String,
    /// User agent of the primary device, if known.
    pub user_agent: Option<String>,
}

impl std::fmt::Debug for ProvisioningPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningPayload")
            .field("account_id", &self.account_id)
            .field("privacy_id", &self.privacy_id)
            .field("number", &self.number)
            .field("read_receipts", &self.read_receipts)
            .field("user_agent", &self.user_agent)
            .field("key_material", &"[REDACTED]")
            .finish()
    }
}

/// Plaintext payload for transferring a fresh registration to a second
/// installation. Carries no identity key pairs.
#[derive(Clone, PartialEq)]
pub struct RegistrationPayload {
    /// Account entropy pool; required for this variant.
    pub entropy_pool: AccountEntropyPool,
    /// Account service identifier.
    pub account_id: Uuid,
    /// Account phone number; never empty.
    pub number: String,
    /// Account PIN, if set.
    pub pin: Option<String>,
    /// Platform of the receiving installation.
    pub platform: DevicePlatform,
    /// Backup subscription tier, if any.
    pub backup_tier: Option<BackupTier>,
    /// Timestamp of the most recent backup, milliseconds since epoch.
    pub backup_timestamp_ms: Option<u64>,
    /// Size of the most recent backup in bytes.
    pub backup_size_bytes: Option<u64>,
    /// Token selecting how the new installation restores.
    pub restore_method_token: Option<String>,
}

impl std::fmt::Debug for RegistrationPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationPayload")
            .field("account_id", &self.account_id)
            .field("number", &self.number)
            .field("platform", &self.platform)
            .field("backup_tier", &self.backup_tier)
            .field("entropy_pool", &"[REDACTED]")
            .field("pin", &self.pin.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy_pool_parse_valid() {
        let value = "a".repeat(64);
        let pool = AccountEntropyPool::parse(&value).unwrap();
        assert_eq!(pool.as_str(), value);
    }

    #[test]
    fn test_entropy_pool_rejects_wrong_length() {
        assert!(AccountEntropyPool::parse(&"a".repeat(63)).is_err());
        assert!(AccountEntropyPool::parse(&"a".repeat(65)).is_err());
        assert!(AccountEntropyPool::parse("").is_err());
    }

    #[test]
    fn test_entropy_pool_rejects_invalid_characters() {
        assert!(AccountEntropyPool::parse(&"A".repeat(64)).is_err());
        assert!(AccountEntropyPool::parse(&"-".repeat(64)).is_err());
    }

    #[test]
    fn test_entropy_pool_generate_is_valid() {
        let pool = AccountEntropyPool::generate();
        assert!(AccountEntropyPool::parse(pool.as_str()).is_ok());
    }

    #[test]
    fn test_entropy_pool_generate_unique() {
        let a = AccountEntropyPool::generate();
        let b = AccountEntropyPool::generate();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_master_key_derivation_deterministic() {
        let pool = AccountEntropyPool::parse(&"k".repeat(64)).unwrap();
        let a = pool.derive_master_key();
        let b = pool.derive_master_key();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_pools_derive_different_master_keys() {
        let a = AccountEntropyPool::parse(&"a".repeat(64)).unwrap();
        let b = AccountEntropyPool::parse(&"b".repeat(64)).unwrap();
        assert_ne!(a.derive_master_key(), b.derive_master_key());
    }

    #[test]
    fn test_ephemeral_backup_key_generate_unique() {
        let a = EphemeralBackupKey::generate();
        let b = EphemeralBackupKey::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let pool = AccountEntropyPool::generate();
        assert!(format!("{:?}", pool).contains("[REDACTED]"));

        let key = MasterKey::from_bytes([7u8; 32]);
        assert!(format!("{:?}", key).contains("[REDACTED]"));

        let backup = EphemeralBackupKey::generate();
        assert!(format!("{:?}", backup).contains("[REDACTED]"));
    }
}
