// SPDX-FileCopyrightText: 2026 Tether Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Provisioning Error Types

use thiserror::Error;

use crate::crypto::EnvelopeError;

/// Errors that can occur while building or parsing provisioning messages.
#[derive(Error, Debug)]
pub enum ProvisioningError {
    /// The plaintext message is missing required fields or carries
    /// unusable ones. Never silently recovered; the payload is
    /// security-relevant.
    #[error("Invalid provision message: {0}")]
    InvalidProvisionMessage(String),

    /// Envelope-layer failure (malformed, version, MAC, decryption).
    /// Integrity failures keep their own kind so callers can distinguish
    /// corrupt data from data that was never theirs.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl ProvisioningError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ProvisioningError::InvalidProvisionMessage(reason.into())
    }
}
