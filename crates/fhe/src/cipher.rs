// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use fhe::bfv::Plaintext;
use hefl_utils::ArcBytes;
use serde::{Deserialize, Serialize};

/// A serialized ciphertext tagged with the context it was produced under and its fixed point scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cipher {
    pub context_id: String,
    pub scale: f64,
    pub bytes: ArcBytes,
}

impl Cipher {
    pub fn size_bytes(&self) -> usize {
        self.bytes.size_bytes()
    }
}

/// Encoded plaintext together with the scale it was encoded at
#[derive(Debug, Clone)]
pub struct ScaledPlaintext {
    pub scale: f64,
    pub plaintext: Plaintext,
}
