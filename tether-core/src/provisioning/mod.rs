// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Provisioning Payloads and Codecs
//!
//! Typed payloads exchanged during device linking and registration
//! transfer, and the codecs that convert them to and from the encrypted
//! provisioning envelope.

mod codec;
mod error;
mod payload;

pub use codec::{LinkingCodec, RegistrationCodec};
pub use error::ProvisioningError;
pub use payload::{
    AccountEntropyPool, EntropyPoolError, EphemeralBackupKey, MasterKey, ProvisioningPayload,
    RegistrationPayload, RootKeyMaterial, ENTROPY_POOL_LENGTH, PROVISIONING_USER_AGENT,
    PROVISIONING_VERSION,
};
