// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

/// `|(max - min) / max|` over the decrypted slots. Identical slots give 0.
pub fn relative_spread(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    if max == min {
        return 0.0;
    }
    ((max - min) / max).abs()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// How a single decrypted ciphertext may be released
#[derive(Debug, Clone, PartialEq)]
pub enum Release {
    /// Every slot carries the same sum, release it as one value
    Flat(f64),
    /// Multi contributor aggregate with the summed noise offsets removed and averaged
    Aggregate(Vec<f64>),
    /// Releasing would expose a single contributor
    Refused,
}

/// Decide what a decryption may release.
///
/// `noise` is the decrypted sum of the contributors' offsets. Results that carry offsets are
/// never collapsed as flat, only averaged when more than one contributor is behind them.
/// The offset check comes before the flat check, so a near uniform aggregate keeps its per
/// slot values instead of collapsing to one mean.
pub fn release(
    decrypted: &[f64],
    contributors: usize,
    noise: Option<&[f64]>,
    tolerance: f64,
) -> Release {
    if noise.is_none() && relative_spread(decrypted) <= tolerance {
        return Release::Flat(mean(decrypted));
    }
    if contributors <= 1 {
        return Release::Refused;
    }
    let k = contributors as f64;
    let values = match noise {
        Some(noise) => decrypted
            .iter()
            .zip(noise.iter().chain(std::iter::repeat(&0.0)))
            .map(|(p, d)| (p - d) / k)
            .collect(),
        None => decrypted.iter().map(|p| p / k).collect(),
    };
    Release::Aggregate(values)
}
