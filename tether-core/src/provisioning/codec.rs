// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Provisioning Message Codecs
//!
//! Convert typed payloads to and from plaintext proto bytes, and drive the
//! envelope cipher to produce and consume the wire envelope. The linking
//! codec understands both the current encoding (binary service identifiers,
//! account entropy pool) and the legacy one (string identifiers, raw master
//! key); the legacy read path can be switched off once old peers are gone.

use prost::Message;
use uuid::Uuid;

use super::error::ProvisioningError;
use super::payload::{
    AccountEntropyPool, EphemeralBackupKey, MasterKey, ProvisioningPayload, RegistrationPayload,
    RootKeyMaterial, PROVISIONING_USER_AGENT, PROVISIONING_VERSION,
};
use crate::crypto::{envelope, AgreementKeyPair, EncryptedEnvelope, IdentityKeyPair};
use crate::wire::{BackupTier, DevicePlatform, ProvisionMessage, RegistrationProvisionMessage};

/// Codec for the linking provisioning message.
#[derive(Clone, Debug)]
pub struct LinkingCodec {
    legacy_decode: bool,
}

impl Default for LinkingCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkingCodec {
    /// Creates a codec that accepts both current and legacy encodings.
    pub fn new() -> Self {
        LinkingCodec { legacy_decode: true }
    }

    /// Controls whether the legacy read path (string identifiers, raw
    /// master key) is attempted during decode.
    pub fn with_legacy_decode(mut self, legacy_decode: bool) -> Self {
        self.legacy_decode = legacy_decode;
        self
    }

    /// Encodes a payload to plaintext proto bytes.
    ///
    /// Both identifier encodings are produced so that older and newer
    /// peers can consume the message. The protocol version and a
    /// user-agent are always embedded.
    pub fn encode(&self, payload: &ProvisioningPayload) -> Vec<u8> {
        let mut msg = ProvisionMessage {
            account_identity_public: Some(payload.account_identity.public_bytes().to_vec()),
            account_identity_private: Some(payload.account_identity.private_bytes().to_vec()),
            privacy_identity_public: Some(payload.privacy_identity.public_bytes().to_vec()),
            privacy_identity_private: Some(payload.privacy_identity.private_bytes().to_vec()),
            number: Some(payload.number.clone()),
            provisioning_code: Some(payload.provisioning_code.clone()),
            user_agent: Some(
                payload
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| PROVISIONING_USER_AGENT.to_string()),
            ),
            profile_key: Some(payload.profile_key.to_vec()),
            read_receipts: Some(payload.read_receipts),
            account_id: Some(payload.account_id.to_string()),
            privacy_id: Some(payload.privacy_id.to_string()),
            account_id_binary: Some(payload.account_id.as_bytes().to_vec()),
            privacy_id_binary: Some(payload.privacy_id.as_bytes().to_vec()),
            provisioning_version: Some(PROVISIONING_VERSION),
            media_backup_key: Some(payload.media_backup_key.to_vec()),
            ephemeral_backup_key: payload
                .ephemeral_backup_key
                .as_ref()
                .map(|k| k.as_bytes().to_vec()),
            master_key: None,
            account_entropy_pool: None,
        };

        match &payload.root_key {
            RootKeyMaterial::EntropyPool(pool) => {
                msg.account_entropy_pool = Some(pool.as_str().to_string());
            }
            RootKeyMaterial::MasterKey(key) => {
                msg.master_key = Some(key.as_bytes().to_vec());
            }
        }

        msg.encode_to_vec()
    }

    /// Decodes plaintext proto bytes into a typed payload.
    pub fn decode(&self, bytes: &[u8]) -> Result<ProvisioningPayload, ProvisioningError> {
        let msg = ProvisionMessage::decode(bytes)
            .map_err(|e| ProvisioningError::invalid(format!("unparsable proto: {}", e)))?;

        let number = msg
            .number
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ProvisioningError::invalid("missing phone number"))?;

        let account_id = self.decode_service_id(
            msg.account_id_binary.as_deref(),
            msg.account_id.as_deref(),
            "account",
        )?;
        let privacy_id = self.decode_service_id(
            msg.privacy_id_binary.as_deref(),
            msg.privacy_id.as_deref(),
            "privacy",
        )?;

        let account_identity = decode_identity(
            msg.account_identity_public.as_deref(),
            msg.account_identity_private.as_deref(),
            "account",
        )?;
        let privacy_identity = decode_identity(
            msg.privacy_identity_public.as_deref(),
            msg.privacy_identity_private.as_deref(),
            "privacy",
        )?;

        let profile_key = decode_key32(msg.profile_key.as_deref(), "profile key")?;
        let media_backup_key = decode_key32(msg.media_backup_key.as_deref(), "media backup key")?;

        let ephemeral_backup_key = match msg.ephemeral_backup_key.as_deref() {
            None => None,
            Some(bytes) => Some(EphemeralBackupKey::from_bytes(
                bytes
                    .try_into()
                    .map_err(|_| ProvisioningError::invalid("invalid ephemeral backup key"))?,
            )),
        };

        let root_key = self.decode_root_key(
            msg.account_entropy_pool.as_deref(),
            msg.master_key.as_deref(),
        )?;

        Ok(ProvisioningPayload {
            root_key,
            account_id,
            privacy_id,
            number,
            account_identity,
            privacy_identity,
            profile_key,
            media_backup_key,
            ephemeral_backup_key,
            read_receipts: msg.read_receipts.unwrap_or(false),
            provisioning_code: msg.provisioning_code.unwrap_or_default(),
            user_agent: msg.user_agent,
        })
    }

    /// Encodes and encrypts a payload for a recipient public key.
    pub fn seal(
        &self,
        payload: &ProvisioningPayload,
        recipient_public: &[u8; 32],
    ) -> Result<EncryptedEnvelope, ProvisioningError> {
        let plaintext = self.encode(payload);
        Ok(envelope::seal(&plaintext, recipient_public)?)
    }

    /// Decrypts and decodes an envelope with the recipient's key pair.
    pub fn open(
        &self,
        sealed: &EncryptedEnvelope,
        recipient: &AgreementKeyPair,
    ) -> Result<ProvisioningPayload, ProvisioningError> {
        let plaintext = envelope::open(sealed, recipient)?;
        self.decode(&plaintext)
    }

    /// Resolution order: the entropy pool is tried first; only if it is
    /// absent or invalid does the legacy master key apply.
    fn decode_root_key(
        &self,
        pool: Option<&str>,
        master_key: Option<&[u8]>,
    ) -> Result<RootKeyMaterial, ProvisioningError> {
        if let Some(pool) = pool {
            if let Ok(pool) = AccountEntropyPool::parse(pool) {
                return Ok(RootKeyMaterial::EntropyPool(pool));
            }
        }

        if !self.legacy_decode {
            return Err(ProvisioningError::invalid(
                "missing or invalid account entropy pool",
            ));
        }

        let bytes: [u8; 32] = master_key
            .ok_or_else(|| ProvisioningError::invalid("missing root key material"))?
            .try_into()
            .map_err(|_| ProvisioningError::invalid("missing root key material"))?;
        Ok(RootKeyMaterial::MasterKey(MasterKey::from_bytes(bytes)))
    }

    fn decode_service_id(
        &self,
        binary: Option<&[u8]>,
        string: Option<&str>,
        which: &str,
    ) -> Result<Uuid, ProvisioningError> {
        if let Some(bytes) = binary {
            let bytes: [u8; 16] = bytes.try_into().map_err(|_| {
                ProvisioningError::invalid(format!("unparsable {} identifier", which))
            })?;
            return Ok(Uuid::from_bytes(bytes));
        }

        if self.legacy_decode {
            if let Some(s) = string {
                return Uuid::parse_str(s).map_err(|_| {
                    ProvisioningError::invalid(format!("unparsable {} identifier", which))
                });
            }
        }

        Err(ProvisioningError::invalid(format!(
            "missing {} identifier",
            which
        )))
    }
}

/// Codec for the registration-transfer provisioning message.
#[derive(Clone, Debug, Default)]
pub struct RegistrationCodec;

impl RegistrationCodec {
    pub fn new() -> Self {
        RegistrationCodec
    }

    /// Encodes a registration payload to plaintext proto bytes.
    pub fn encode(&self, payload: &RegistrationPayload) -> Vec<u8> {
        RegistrationProvisionMessage {
            account_entropy_pool: Some(payload.entropy_pool.as_str().to_string()),
            account_id_binary: Some(payload.account_id.as_bytes().to_vec()),
            number: Some(payload.number.clone()),
            pin: payload.pin.clone(),
            platform: Some(payload.platform as i32),
            backup_timestamp_ms: payload.backup_timestamp_ms,
            backup_size_bytes: payload.backup_size_bytes,
            backup_tier: payload.backup_tier.map(|t| t as i32),
            restore_method_token: payload.restore_method_token.clone(),
        }
        .encode_to_vec()
    }

    /// Decodes plaintext proto bytes into a registration payload.
    pub fn decode(&self, bytes: &[u8]) -> Result<RegistrationPayload, ProvisioningError> {
        let msg = RegistrationProvisionMessage::decode(bytes)
            .map_err(|e| ProvisioningError::invalid(format!("unparsable proto: {}", e)))?;

        let entropy_pool = msg
            .account_entropy_pool
            .as_deref()
            .map(AccountEntropyPool::parse)
            .and_then(Result::ok)
            .ok_or_else(|| {
                ProvisioningError::invalid("missing or invalid account entropy pool")
            })?;

        let account_id_bytes: [u8; 16] = msg
            .account_id_binary
            .ok_or_else(|| ProvisioningError::invalid("missing account identifier"))?
            .as_slice()
            .try_into()
            .map_err(|_| ProvisioningError::invalid("unparsable account identifier"))?;

        let number = msg
            .number
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ProvisioningError::invalid("missing phone number"))?;

        // Unknown enum values fall back rather than fail: the sender may be
        // newer than us and these fields are advisory.
        let platform = msg
            .platform
            .and_then(|p| DevicePlatform::try_from(p).ok())
            .unwrap_or(DevicePlatform::Unknown);
        let backup_tier = msg.backup_tier.and_then(|t| BackupTier::try_from(t).ok());

        Ok(RegistrationPayload {
            entropy_pool,
            account_id: Uuid::from_bytes(account_id_bytes),
            number,
            pin: msg.pin,
            platform,
            backup_tier,
            backup_timestamp_ms: msg.backup_timestamp_ms,
            backup_size_bytes: msg.backup_size_bytes,
            restore_method_token: msg.restore_method_token,
        })
    }

    /// Encodes and encrypts a registration payload for a recipient key.
    pub fn seal(
        &self,
        payload: &RegistrationPayload,
        recipient_public: &[u8; 32],
    ) -> Result<EncryptedEnvelope, ProvisioningError> {
        let plaintext = self.encode(payload);
        Ok(envelope::seal(&plaintext, recipient_public)?)
    }

    /// Decrypts and decodes a registration envelope.
    pub fn open(
        &self,
        sealed: &EncryptedEnvelope,
        recipient: &AgreementKeyPair,
    ) -> Result<RegistrationPayload, ProvisioningError> {
        let plaintext = envelope::open(sealed, recipient)?;
        self.decode(&plaintext)
    }
}

fn decode_identity(
    public: Option<&[u8]>,
    private: Option<&[u8]>,
    which: &str,
) -> Result<IdentityKeyPair, ProvisioningError> {
    let private: [u8; 32] = private
        .ok_or_else(|| ProvisioningError::invalid(format!("missing {} identity key", which)))?
        .try_into()
        .map_err(|_| ProvisioningError::invalid(format!("invalid {} identity key", which)))?;

    let pair = IdentityKeyPair::from_private_bytes(private);

    // When the public half is present it must match the derived one;
    // a mismatch means the message was assembled from mixed key material.
    if let Some(public) = public {
        let public: [u8; 32] = public
            .try_into()
            .map_err(|_| ProvisioningError::invalid(format!("invalid {} identity key", which)))?;
        if &public != pair.public_bytes() {
            return Err(ProvisioningError::invalid(format!(
                "{} identity key mismatch",
                which
            )));
        }
    }

    Ok(pair)
}

fn decode_key32(bytes: Option<&[u8]>, name: &str) -> Result<[u8; 32], ProvisioningError> {
    bytes
        .ok_or_else(|| ProvisioningError::invalid(format!("missing {}", name)))?
        .try_into()
        .map_err(|_| ProvisioningError::invalid(format!("{} must be 32 bytes", name)))
}
