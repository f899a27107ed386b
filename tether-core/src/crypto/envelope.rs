// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Provisioning Envelope Cipher
//!
//! One-shot authenticated encryption addressed to a recipient public key.
//! A fresh ephemeral X25519 pair is generated per envelope, so no shared
//! secret exists between the two devices beforehand and each provisioning
//! attempt is independently keyed.
//!
//! Ciphertext body format: `version (1 byte) || iv (16 bytes) || AES-256-CBC
//! ciphertext || HMAC-SHA256 tag (32 bytes)`, keyed from
//! HKDF(ECDH shared secret) split into a cipher key and a MAC key.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use prost::Message;
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

use super::agreement::AgreementKeyPair;
use super::kdf::Hkdf;
use crate::wire::ProvisionEnvelope;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// HKDF context string for envelope key derivation.
const ENVELOPE_KDF_INFO: &[u8] = b"Tether Provisioning Message";

/// Initialization vector size for AES-256-CBC.
const IV_SIZE: usize = 16;
/// HMAC-SHA256 tag size.
const MAC_SIZE: usize = 32;

/// Envelope cipher error types.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Envelope too short or structurally invalid")]
    Malformed,

    #[error("Unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    #[error("Envelope MAC verification failed")]
    MacMismatch,

    #[error("Decryption failed: data may be corrupted or wrong key")]
    DecryptionFailed,

    #[error("Encryption failed")]
    EncryptionFailed,
}

/// An encrypted provisioning envelope: the ephemeral public key plus the
/// authenticated ciphertext body.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// Ephemeral X25519 public key the sender generated for this envelope.
    pub ephemeral_public: [u8; 32],
    /// `version || iv || ciphertext || mac`
    pub body: Vec<u8>,
}

impl std::fmt::Debug for EncryptedEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedEnvelope")
            .field("ephemeral_public", &hex::encode(self.ephemeral_public))
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl EncryptedEnvelope {
    /// Serializes the envelope to its wire form.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        ProvisionEnvelope {
            public_key: Some(self.ephemeral_public.to_vec()),
            body: Some(self.body.clone()),
        }
        .encode_to_vec()
    }

    /// Parses an envelope from its wire form.
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let proto = ProvisionEnvelope::decode(bytes).map_err(|_| EnvelopeError::Malformed)?;

        let ephemeral_public: [u8; 32] = proto
            .public_key
            .ok_or(EnvelopeError::Malformed)?
            .try_into()
            .map_err(|_| EnvelopeError::Malformed)?;
        let body = proto.body.ok_or(EnvelopeError::Malformed)?;

        Ok(EncryptedEnvelope {
            ephemeral_public,
            body,
        })
    }
}

/// Encrypts a plaintext for a recipient public key.
///
/// A fresh ephemeral key pair is generated internally; its secret half never
/// leaves this function.
pub fn seal(plaintext: &[u8], recipient_public: &[u8; 32]) -> Result<EncryptedEnvelope, EnvelopeError> {
    seal_inner(plaintext, recipient_public, AgreementKeyPair::generate())
}

/// Encrypts with a caller-supplied ephemeral key pair.
///
/// Only for deterministic tests; production callers use [`seal`].
#[cfg(any(test, feature = "testing"))]
pub fn seal_with_ephemeral(
    plaintext: &[u8],
    recipient_public: &[u8; 32],
    ephemeral: AgreementKeyPair,
) -> Result<EncryptedEnvelope, EnvelopeError> {
    seal_inner(plaintext, recipient_public, ephemeral)
}

fn seal_inner(
    plaintext: &[u8],
    recipient_public: &[u8; 32],
    ephemeral: AgreementKeyPair,
) -> Result<EncryptedEnvelope, EnvelopeError> {
    let shared_secret = ephemeral.diffie_hellman(recipient_public);
    let (cipher_key, mac_key) = Hkdf::derive_key_pair(None, &shared_secret, ENVELOPE_KDF_INFO);

    let rng = SystemRandom::new();
    let mut iv = [0u8; IV_SIZE];
    rng.fill(&mut iv).map_err(|_| EnvelopeError::EncryptionFailed)?;

    let ciphertext =
        Aes256CbcEnc::new(&cipher_key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut body = Vec::with_capacity(1 + IV_SIZE + ciphertext.len() + MAC_SIZE);
    body.push(ENVELOPE_VERSION);
    body.extend_from_slice(&iv);
    body.extend_from_slice(&ciphertext);

    let mac_key = hmac::Key::new(hmac::HMAC_SHA256, &mac_key);
    let mac = hmac::sign(&mac_key, &body);
    body.extend_from_slice(mac.as_ref());

    Ok(EncryptedEnvelope {
        ephemeral_public: *ephemeral.public_bytes(),
        body,
    })
}

/// Decrypts an envelope with the recipient's key pair.
///
/// ECDH symmetry yields the same shared secret the sender derived, so the
/// MAC is verified (constant-time) before any decryption is attempted.
pub fn open(
    envelope: &EncryptedEnvelope,
    recipient: &AgreementKeyPair,
) -> Result<Vec<u8>, EnvelopeError> {
    if envelope.body.len() < 1 + IV_SIZE + MAC_SIZE {
        return Err(EnvelopeError::Malformed);
    }

    let version = envelope.body[0];
    if version != ENVELOPE_VERSION {
        return Err(EnvelopeError::UnsupportedVersion(version));
    }

    let shared_secret = recipient.diffie_hellman(&envelope.ephemeral_public);
    let (cipher_key, mac_key) = Hkdf::derive_key_pair(None, &shared_secret, ENVELOPE_KDF_INFO);

    let mac_offset = envelope.body.len() - MAC_SIZE;
    let (message, mac) = envelope.body.split_at(mac_offset);

    let mac_key = hmac::Key::new(hmac::HMAC_SHA256, &mac_key);
    hmac::verify(&mac_key, message, mac).map_err(|_| EnvelopeError::MacMismatch)?;

    let iv: [u8; IV_SIZE] = message[1..1 + IV_SIZE]
        .try_into()
        .map_err(|_| EnvelopeError::Malformed)?;
    let ciphertext = &message[1 + IV_SIZE..];

    Aes256CbcDec::new(&cipher_key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EnvelopeError::DecryptionFailed)
}

// INLINE_TEST_REQUIRED: Tests private ENVELOPE_KDF_INFO domain separation and body layout offsets
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let recipient = AgreementKeyPair::generate();
        let plaintext = b"the provisioning payload";

        let envelope = seal(plaintext, recipient.public_bytes()).unwrap();
        let decrypted = open(&envelope, &recipient).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_seal_fresh_ephemeral_per_call() {
        let recipient = AgreementKeyPair::generate();

        let a = seal(b"payload", recipient.public_bytes()).unwrap();
        let b = seal(b"payload", recipient.public_bytes()).unwrap();

        assert_ne!(a.ephemeral_public, b.ephemeral_public);
        assert_ne!(a.body, b.body);
    }

    #[test]
    fn test_open_wrong_recipient_fails_mac() {
        let recipient = AgreementKeyPair::generate();
        let other = AgreementKeyPair::generate();

        let envelope = seal(b"payload", recipient.public_bytes()).unwrap();
        let result = open(&envelope, &other);

        assert!(matches!(result, Err(EnvelopeError::MacMismatch)));
    }

    #[test]
    fn test_open_truncated_body_malformed() {
        let recipient = AgreementKeyPair::generate();
        let envelope = EncryptedEnvelope {
            ephemeral_public: *AgreementKeyPair::generate().public_bytes(),
            body: vec![ENVELOPE_VERSION; 1 + IV_SIZE + MAC_SIZE - 1],
        };

        let result = open(&envelope, &recipient);
        assert!(matches!(result, Err(EnvelopeError::Malformed)));
    }

    #[test]
    fn test_open_unsupported_version() {
        let recipient = AgreementKeyPair::generate();
        let mut envelope = seal(b"payload", recipient.public_bytes()).unwrap();
        envelope.body[0] = 99;

        let result = open(&envelope, &recipient);
        assert!(matches!(result, Err(EnvelopeError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_tamper_any_bit_rejected() {
        let recipient = AgreementKeyPair::generate();
        let envelope = seal(b"payload to protect", recipient.public_bytes()).unwrap();

        // Flip one bit in every byte position after the version byte.
        for i in 1..envelope.body.len() {
            let mut tampered = envelope.clone();
            tampered.body[i] ^= 0x01;
            let result = open(&tampered, &recipient);
            assert!(
                matches!(result, Err(EnvelopeError::MacMismatch)),
                "byte {} not caught by MAC",
                i
            );
        }
    }

    #[test]
    fn test_wire_roundtrip() {
        let recipient = AgreementKeyPair::generate();
        let envelope = seal(b"payload", recipient.public_bytes()).unwrap();

        let wire = envelope.to_wire_bytes();
        let restored = EncryptedEnvelope::from_wire_bytes(&wire).unwrap();

        assert_eq!(restored, envelope);
        assert_eq!(open(&restored, &recipient).unwrap(), b"payload");
    }

    #[test]
    fn test_wire_missing_fields_malformed() {
        let proto = ProvisionEnvelope {
            public_key: None,
            body: Some(vec![1, 2, 3]),
        };
        let result = EncryptedEnvelope::from_wire_bytes(&proto.encode_to_vec());
        assert!(matches!(result, Err(EnvelopeError::Malformed)));
    }

    #[test]
    fn test_deterministic_with_injected_ephemeral() {
        let recipient = AgreementKeyPair::from_bytes([0x11u8; 32]);
        let eph = AgreementKeyPair::from_bytes([0x22u8; 32]);

        let envelope =
            seal_with_ephemeral(b"payload", recipient.public_bytes(), eph.clone()).unwrap();
        assert_eq!(&envelope.ephemeral_public, eph.public_bytes());

        // The IV is still random, so only the ephemeral key is pinned.
        let decrypted = open(&envelope, &recipient).unwrap();
        assert_eq!(decrypted, b"payload");
    }
}
