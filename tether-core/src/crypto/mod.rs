// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod agreement;
pub mod envelope;
pub mod kdf;
pub mod name_cipher;

pub use agreement::{AgreementKeyPair, IdentityKeyPair};
pub use envelope::{EncryptedEnvelope, EnvelopeError, ENVELOPE_VERSION};
pub use kdf::{KdfError, Hkdf};
pub use name_cipher::{decrypt_device_name, encrypt_device_name, NameCipherError};
