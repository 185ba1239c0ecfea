// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::GatewayError;
use anyhow::Result;
use hefl_fhe::{Cipher, HeContext};
use hefl_model::{plan_series, ChunkSeries};
use hefl_protocol::Recovered;

/// Chunkwise homomorphic sum of several models, seeded with the first one
pub fn sum_models(he: &HeContext, models: &[Vec<Cipher>]) -> Result<Vec<Cipher>> {
    let Some((first, rest)) = models.split_first() else {
        return Ok(vec![]);
    };
    let mut sum = first.clone();
    for model in rest {
        if model.len() != sum.len() {
            return Err(GatewayError::IncompatibleShape {
                global: sum.len(),
                local: model.len(),
            }
            .into());
        }
        sum = sum
            .iter()
            .zip(model)
            .map(|(acc, c)| he.add(acc, c))
            .collect::<Result<_, _>>()?;
    }
    Ok(sum)
}

/// Cut released aggregate chunks to the widths the model's chunks actually use
pub fn fit_to_widths(values: Vec<Recovered>, widths: &[usize]) -> Vec<Vec<f64>> {
    values
        .into_iter()
        .zip(widths)
        .map(|(value, width)| match value {
            Recovered::Vector(mut v) => {
                v.resize(*width, 0.0);
                v
            }
            Recovered::Scalar(s) => vec![s; *width],
        })
        .collect()
}

pub fn is_all_zero(chunks: &[Vec<f64>]) -> bool {
    chunks.iter().flatten().all(|v| *v == 0.0)
}

/// Encrypt plaintext chunks and lay them out in transactions of at most `chunk_limit`
pub fn encrypt_series(
    he: &HeContext,
    plain: &[Vec<f64>],
    chunk_limit: usize,
) -> Result<ChunkSeries<Cipher>> {
    let ciphers = plain
        .iter()
        .map(|chunk| he.encrypt_values(chunk))
        .collect::<Result<Vec<_>, _>>()?;
    let plan = plan_series(&ciphers, chunk_limit);
    let mut series = ChunkSeries::new(plan.len());
    for (marker, part) in plan {
        series.insert(marker, part)?;
    }
    Ok(series)
}
