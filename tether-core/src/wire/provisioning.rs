// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Provisioning payload protos.
//!
//! `ProvisionMessage` carries both the current field set (binary service
//! identifiers, account entropy pool) and the legacy one (string
//! identifiers, raw master key); peers populate whichever generation they
//! speak and readers fall back field by field.

/// The outer provisioning envelope: ephemeral public key plus authenticated
/// ciphertext.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProvisionEnvelope {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub public_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub body: Option<Vec<u8>>,
}

/// Plaintext of a linking provisioning message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProvisionMessage {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub account_identity_public: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub account_identity_private: Option<Vec<u8>>,
    #[prost(string, optional, tag = "3")]
    pub number: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub provisioning_code: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub user_agent: Option<String>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub profile_key: Option<Vec<u8>>,
    #[prost(bool, optional, tag = "7")]
    pub read_receipts: Option<bool>,
    /// Legacy string form of the account service identifier.
    #[prost(string, optional, tag = "8")]
    pub account_id: Option<String>,
    #[prost(uint32, optional, tag = "9")]
    pub provisioning_version: Option<u32>,
    /// Legacy string form of the privacy service identifier.
    #[prost(string, optional, tag = "10")]
    pub privacy_id: Option<String>,
    #[prost(bytes = "vec", optional, tag = "11")]
    pub privacy_identity_public: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "12")]
    pub privacy_identity_private: Option<Vec<u8>>,
    /// Legacy root key material; superseded by `account_entropy_pool`.
    #[prost(bytes = "vec", optional, tag = "13")]
    pub master_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "14")]
    pub ephemeral_backup_key: Option<Vec<u8>>,
    #[prost(string, optional, tag = "15")]
    pub account_entropy_pool: Option<String>,
    #[prost(bytes = "vec", optional, tag = "16")]
    pub media_backup_key: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "17")]
    pub account_id_binary: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "18")]
    pub privacy_id_binary: Option<Vec<u8>>,
}

/// Plaintext of a registration-transfer provisioning message.
///
/// Transfers a fresh registration to a second installation; carries no
/// identity key pairs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegistrationProvisionMessage {
    #[prost(string, optional, tag = "1")]
    pub account_entropy_pool: Option<String>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub account_id_binary: Option<Vec<u8>>,
    #[prost(string, optional, tag = "3")]
    pub number: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub pin: Option<String>,
    #[prost(enumeration = "DevicePlatform", optional, tag = "5")]
    pub platform: Option<i32>,
    #[prost(uint64, optional, tag = "6")]
    pub backup_timestamp_ms: Option<u64>,
    #[prost(uint64, optional, tag = "7")]
    pub backup_size_bytes: Option<u64>,
    #[prost(enumeration = "BackupTier", optional, tag = "8")]
    pub backup_tier: Option<i32>,
    #[prost(string, optional, tag = "9")]
    pub restore_method_token: Option<String>,
}

/// Encrypted device display name.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceName {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub ephemeral_public: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub synthetic_iv: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub ciphertext: Option<Vec<u8>>,
}

/// Provisioning UUID delivered over the channel (`PUT /v1/address`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProvisioningAddress {
    #[prost(string, optional, tag = "1")]
    pub uuid: Option<String>,
}

/// Platform of the installation a registration is transferred to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ::prost::Enumeration)]
#[repr(i32)]
pub enum DevicePlatform {
    Unknown = 0,
    Android = 1,
    Ios = 2,
    Desktop = 3,
}

/// Paid tier of the message backup subscription, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ::prost::Enumeration)]
#[repr(i32)]
pub enum BackupTier {
    Unspecified = 0,
    Free = 1,
    Paid = 2,
}
