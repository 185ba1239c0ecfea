// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{FheError, FheResult};
use fhe::bfv::{EvaluationKey, PublicKey, RelinearizationKey, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four key roles an encryption context may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyRole {
    Encryption,
    Secret,
    Galois,
    Relinearization,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyRole::Encryption => "encryption",
            KeyRole::Secret => "secret",
            KeyRole::Galois => "galois",
            KeyRole::Relinearization => "relinearization",
        };
        f.write_str(name)
    }
}

/// Capability set of keys held by one process.
///
/// Every operation asks for the roles it needs and fails with [`FheError::MissingKey`] when the
/// role is absent. A key set rebuilt from a public [`EncryptionContext`](crate::EncryptionContext)
/// never holds a secret key.
#[derive(Default)]
pub struct KeySet {
    encryption: Option<PublicKey>,
    secret: Option<SecretKey>,
    galois: Option<EvaluationKey>,
    relinearization: Option<RelinearizationKey>,
}

impl KeySet {
    pub fn new(
        encryption: Option<PublicKey>,
        secret: Option<SecretKey>,
        galois: Option<EvaluationKey>,
        relinearization: Option<RelinearizationKey>,
    ) -> Self {
        Self {
            encryption,
            secret,
            galois,
            relinearization,
        }
    }

    pub fn encryption(&self) -> FheResult<&PublicKey> {
        self.encryption
            .as_ref()
            .ok_or(FheError::MissingKey(KeyRole::Encryption))
    }

    pub fn secret(&self) -> FheResult<&SecretKey> {
        self.secret.as_ref().ok_or(FheError::MissingKey(KeyRole::Secret))
    }

    pub fn galois(&self) -> FheResult<&EvaluationKey> {
        self.galois.as_ref().ok_or(FheError::MissingKey(KeyRole::Galois))
    }

    pub fn relinearization(&self) -> FheResult<&RelinearizationKey> {
        self.relinearization
            .as_ref()
            .ok_or(FheError::MissingKey(KeyRole::Relinearization))
    }

    pub fn has(&self, role: KeyRole) -> bool {
        match role {
            KeyRole::Encryption => self.encryption.is_some(),
            KeyRole::Secret => self.secret.is_some(),
            KeyRole::Galois => self.galois.is_some(),
            KeyRole::Relinearization => self.relinearization.is_some(),
        }
    }

    /// Drop the secret key, keeping only the public roles
    pub fn without_secret(mut self) -> Self {
        self.secret = None;
        self
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("encryption", &self.encryption.is_some())
            .field("secret", &self.secret.is_some())
            .field("galois", &self.galois.is_some())
            .field("relinearization", &self.relinearization.is_some())
            .finish()
    }
}
