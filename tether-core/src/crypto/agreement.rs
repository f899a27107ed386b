// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! X25519 Key Agreement
//!
//! Key pairs for Diffie-Hellman agreement. Ephemeral pairs are generated
//! per envelope or name encryption and never persisted; identity pairs are
//! long-lived and transferred inside a provisioning message.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

/// X25519 key pair for Diffie-Hellman key agreement.
pub struct AgreementKeyPair {
    /// The static secret key
    secret: StaticSecret,
    /// The public key (cached for efficiency)
    public: PublicKey,
}

impl AgreementKeyPair {
    /// Generates a new random X25519 key pair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);

        AgreementKeyPair { secret, public }
    }

    /// Creates a key pair from a 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);

        AgreementKeyPair { secret, public }
    }

    /// Returns the public key bytes.
    pub fn public_bytes(&self) -> &[u8; 32] {
        self.public.as_bytes()
    }

    /// Returns the secret key bytes (for transfer inside a provisioning
    /// message).
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Performs Diffie-Hellman key agreement with a public key.
    ///
    /// Returns the 32-byte shared secret.
    pub fn diffie_hellman(&self, their_public: &[u8; 32]) -> [u8; 32] {
        let their_public_key = PublicKey::from(*their_public);
        let shared = self.secret.diffie_hellman(&their_public_key);
        *shared.as_bytes()
    }
}

impl Clone for AgreementKeyPair {
    fn clone(&self) -> Self {
        AgreementKeyPair {
            secret: self.secret.clone(),
            public: self.public,
        }
    }
}

impl std::fmt::Debug for AgreementKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgreementKeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// A long-lived identity key pair (account or privacy identity).
///
/// Thin wrapper over [`AgreementKeyPair`] so provisioning code can name the
/// two identities it carries without confusing them with ephemeral pairs.
#[derive(Clone, Debug)]
pub struct IdentityKeyPair {
    keys: AgreementKeyPair,
}

impl IdentityKeyPair {
    /// Generates a fresh identity key pair.
    pub fn generate() -> Self {
        IdentityKeyPair {
            keys: AgreementKeyPair::generate(),
        }
    }

    /// Reconstructs an identity key pair from its private key bytes.
    ///
    /// The public key is derived, so a pair restored from a provisioning
    /// message is always internally consistent.
    pub fn from_private_bytes(private: [u8; 32]) -> Self {
        IdentityKeyPair {
            keys: AgreementKeyPair::from_bytes(private),
        }
    }

    /// Returns the public key bytes.
    pub fn public_bytes(&self) -> &[u8; 32] {
        self.keys.public_bytes()
    }

    /// Returns the private key bytes.
    pub fn private_bytes(&self) -> [u8; 32] {
        self.keys.secret_bytes()
    }

    /// Performs Diffie-Hellman agreement with a public key.
    pub fn diffie_hellman(&self, their_public: &[u8; 32]) -> [u8; 32] {
        self.keys.diffie_hellman(their_public)
    }
}

impl PartialEq for IdentityKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.private_bytes() == other.private_bytes()
    }
}

impl Eq for IdentityKeyPair {}
