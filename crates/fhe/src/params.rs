// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::FheResult;
use fhe::bfv::{BfvParameters, BfvParametersBuilder};
use hefl_config::FhePreset;
use std::sync::Arc;

/// 46 bit prime congruent to 1 mod 16384 so that SIMD batching works up to degree 8192
pub const PLAINTEXT_MODULUS: u64 = 0x3ffffff84001;

/// Three 60 bit NTT friendly primes leaving room for one multiplication plus key switching
pub const MODULI: [u64; 3] = [0xfffffffffffc001, 0xffffffffffe8001, 0xffffffffffd8001];

pub const SCHEME: &str = "BFV";

/// Parameter set resolved from a [`FhePreset`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetParams {
    pub degree: usize,
    pub plaintext_modulus: u64,
    pub moduli: Vec<u64>,
    /// Security label recorded in the public context
    pub security: &'static str,
}

pub fn preset_params(preset: FhePreset) -> PresetParams {
    match preset {
        FhePreset::Secure8192 => PresetParams {
            degree: 8192,
            plaintext_modulus: PLAINTEXT_MODULUS,
            moduli: MODULI.to_vec(),
            security: "TC128",
        },
        FhePreset::Insecure2048 => PresetParams {
            degree: 2048,
            plaintext_modulus: PLAINTEXT_MODULUS,
            moduli: MODULI.to_vec(),
            security: "none",
        },
    }
}

pub fn build_bfv_params_arc(
    degree: usize,
    plaintext_modulus: u64,
    moduli: &[u64],
) -> FheResult<Arc<BfvParameters>> {
    Ok(BfvParametersBuilder::new()
        .set_degree(degree)
        .set_plaintext_modulus(plaintext_modulus)
        .set_moduli(moduli)
        .build_arc()?)
}

/// Bit size of each coefficient modulus
pub fn bit_sizes(moduli: &[u64]) -> Vec<u32> {
    moduli.iter().map(|m| u64::BITS - m.leading_zeros()).collect()
}
