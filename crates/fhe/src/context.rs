// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use hefl_utils::ArcBytes;
use serde::{Deserialize, Serialize};

/// Public key material of a context. There is deliberately no place for a secret key here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeys {
    pub encryption: ArcBytes,
    pub galois: ArcBytes,
    pub relinearization: ArcBytes,
}

/// Everything a party needs to encrypt and evaluate under a session's keys.
///
/// Created once per session by the key holder and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionContext {
    pub scheme: String,
    pub security: String,
    pub degree: usize,
    pub plaintext_modulus: u64,
    pub moduli: Vec<u64>,
    pub bit_sizes: Vec<u32>,
    /// Serialized parameter set
    pub params: ArcBytes,
    /// Default fixed point scale for encoding
    pub scale: f64,
    /// Digest of the parameters and encryption key
    pub id: String,
    pub keys: PublicKeys,
}

impl EncryptionContext {
    /// Number of real values one ciphertext carries
    pub fn slot_count(&self) -> usize {
        self.degree / 2
    }
}
