// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 content digest as lowercase hex
pub fn digest_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// Content digest of the JSON representation of a value.
///
/// Used for content-hash ids of models so that two identical plaintext models
/// always receive the same id.
pub fn digest_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value).context("Could not serialize value for digest")?;
    Ok(digest_hex(json))
}

const CERT_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const CERT_END: &str = "-----END CERTIFICATE-----";

/// Digest of a caller identity.
///
/// When the identity carries a PEM certificate only the certificate body is
/// hashed so that framing around it does not change the identity.
pub fn identity_digest(identity: &str) -> String {
    let body = match (identity.find(CERT_BEGIN), identity.find(CERT_END)) {
        (Some(start), Some(end)) if start + CERT_BEGIN.len() <= end => {
            identity[start + CERT_BEGIN.len()..end].trim()
        }
        _ => identity,
    };
    digest_hex(body)
}
