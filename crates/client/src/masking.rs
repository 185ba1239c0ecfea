// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::ClientError;
use anyhow::Result;
use hefl_fhe::{Cipher, HeContext};
use hefl_model::chunk_values;
use hefl_utils::{digest_json, with_rng, SharedRng};
use rand::Rng;

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Draw the offset a submission is masked with: the values' standard deviation times a non zero
/// factor uniform in `(-noise_range, noise_range)`. Constant models use a unit deviation so the
/// offset never vanishes.
pub fn masking_offset(values: &[f64], noise_range: f64, rng: &SharedRng) -> Result<f64> {
    if !(noise_range > 0.0 && noise_range.is_finite()) {
        return Err(ClientError::NoiseRange(noise_range).into());
    }
    let spread = match std_dev(values) {
        s if s > 0.0 => s,
        _ => 1.0,
    };
    let factor = with_rng(rng, |rng| loop {
        let r: f64 = rng.gen_range(-noise_range..noise_range);
        if r != 0.0 {
            break r;
        }
    })?;
    Ok(spread * factor)
}

/// An encrypted, masked model ready for upload
#[derive(Debug, Clone)]
pub struct MaskedModel {
    /// Content digest of the ciphertext chunks
    pub id: String,
    pub chunks: Vec<Cipher>,
    /// The offset alone, in every slot
    pub delta: Cipher,
}

/// Encrypt `values + offset` in slot sized chunks. Slots past the end of the values carry the
/// offset as well so that it cancels slot for slot against `delta`.
pub fn mask_and_encrypt(he: &HeContext, values: &[f64], offset: f64) -> Result<MaskedModel> {
    if values.is_empty() {
        return Err(ClientError::EmptyModel.into());
    }
    let slots = he.slot_count();
    let chunks = chunk_values(values, slots)
        .into_iter()
        .map(|mut chunk| {
            chunk.resize(slots, 0.0);
            chunk.iter_mut().for_each(|v| *v += offset);
            he.encrypt_values(&chunk)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let delta = he.encrypt_values(&vec![offset; slots])?;
    Ok(MaskedModel {
        id: digest_json(&chunks)?,
        chunks,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hefl_config::FhePreset;
    use hefl_utils::create_shared_rng_from_u64;

    #[test]
    fn deviation_of_known_values() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[3.0, 3.0]), 0.0);
        assert!((std_dev(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn offsets_are_bounded_and_non_zero() -> Result<()> {
        let rng = create_shared_rng_from_u64(9);
        let values = [0.5, -0.5, 0.5, -0.5];
        for _ in 0..50 {
            let offset = masking_offset(&values, 2.0, &rng)?;
            assert!(offset != 0.0);
            assert!(offset.abs() < 1.0);
        }
        // constant input still gets masked
        assert!(masking_offset(&[0.0; 4], 1.0, &rng)? != 0.0);
        Ok(())
    }

    #[test]
    fn rejects_bad_noise_range() {
        let rng = create_shared_rng_from_u64(9);
        for range in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(masking_offset(&[1.0], range, &rng).is_err());
        }
    }

    #[test]
    fn masked_chunks_unmask_to_the_values() -> Result<()> {
        let he = HeContext::generate(
            FhePreset::Insecure2048,
            4096.0,
            create_shared_rng_from_u64(4),
        )?;
        let values: Vec<f64> = (0..1500).map(|i| (i % 7) as f64 / 10.0).collect();
        let masked = mask_and_encrypt(&he, &values, 0.75)?;
        assert_eq!(masked.chunks.len(), 2);

        let delta = he.decrypt_values(&masked.delta)?;
        let mut recovered = vec![];
        for chunk in &masked.chunks {
            let decrypted = he.decrypt_values(chunk)?;
            recovered.extend(decrypted.iter().zip(&delta).map(|(v, d)| v - d));
        }
        for (got, want) in recovered.iter().zip(&values) {
            assert!((got - want).abs() < 1e-3);
        }
        // padding slots carry nothing once unmasked
        assert!(recovered[values.len()..].iter().all(|v| v.abs() < 1e-3));
        Ok(())
    }

    #[test]
    fn empty_models_are_not_encrypted() -> Result<()> {
        let he = HeContext::generate(
            FhePreset::Insecure2048,
            4096.0,
            create_shared_rng_from_u64(4),
        )?;
        let Err(err) = mask_and_encrypt(&he, &[], 1.0) else {
            anyhow::bail!("empty model must be rejected");
        };
        assert_eq!(err.downcast_ref::<ClientError>(), Some(&ClientError::EmptyModel));
        Ok(())
    }
}
