// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::GatewayError;
use anyhow::Result;
use hefl_fhe::{Cipher, HeContext};
use hefl_protocol::Recovered;
use tracing::trace;

/// Encrypted slot sums behind the cosine distance of a local model to the global model
#[derive(Debug, Clone)]
pub struct SimilarityCiphers {
    pub global_norms: Vec<Cipher>,
    pub local_norms: Vec<Cipher>,
    pub dots: Vec<Cipher>,
}

/// Per chunk `|g|^2`, `|l|^2` and `l . g` where `g` is the global chunk shifted by the local
/// model's noise offset, so that both sides carry the same offset.
pub fn similarity_ciphers(
    he: &HeContext,
    local: &[Cipher],
    global: &[Cipher],
    delta: &Cipher,
) -> Result<SimilarityCiphers> {
    if local.len() != global.len() {
        return Err(GatewayError::IncompatibleShape {
            global: global.len(),
            local: local.len(),
        }
        .into());
    }

    let mut parts = SimilarityCiphers {
        global_norms: Vec::with_capacity(global.len()),
        local_norms: Vec::with_capacity(local.len()),
        dots: Vec::with_capacity(local.len()),
    };
    for (i, (l, g)) in local.iter().zip(global).enumerate() {
        trace!("scoring chunk {}", i);
        let g = he.add(g, delta)?;
        parts.global_norms.push(he.squared_norm(&g, None)?);
        parts.local_norms.push(he.squared_norm(l, None)?);
        parts.dots.push(he.dot_product(l, &g)?);
    }
    Ok(parts)
}

/// Sum of everything a guarded decryption released
pub fn recovered_sum(values: &[Recovered]) -> f64 {
    values
        .iter()
        .map(|v| match v {
            Recovered::Scalar(s) => *s,
            Recovered::Vector(vs) => vs.iter().sum(),
        })
        .sum()
}

/// `1 - dot / (|g| |l|)`. Degenerate norms give the maximal distance of 1.
pub fn cosine_distance(global_norm_sq: f64, local_norm_sq: f64, dot: f64) -> f64 {
    let denominator = global_norm_sq.max(0.0).sqrt() * local_norm_sq.max(0.0).sqrt();
    if denominator == 0.0 || !denominator.is_finite() || !dot.is_finite() {
        return 1.0;
    }
    1.0 - dot / denominator
}
