// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    bit_sizes, build_bfv_params_arc, preset_params, Cipher, EncryptionContext, FheError,
    FheResult, KeyRole, KeySet, PresetParams, PublicKeys, ScaledPlaintext, SCHEME,
};
use fhe::bfv::{
    BfvParameters, Ciphertext, Encoding, EvaluationKey, EvaluationKeyBuilder, Plaintext,
    PublicKey, RelinearizationKey, SecretKey,
};
use fhe_traits::{
    Deserialize, DeserializeParametrized, FheDecoder, FheDecrypter, FheEncoder, FheEncrypter,
    Serialize,
};
use hefl_config::FhePreset;
use hefl_utils::{digest_hex, ArcBytes, SharedRng};
use rand_chacha::ChaCha20Rng;
use std::sync::{Arc, MutexGuard};
use tracing::{debug, trace};

/// Runtime handle over one set of encryption parameters and the keys this process holds.
///
/// Native key material is owned by the handle and released when it is dropped, on every path.
pub struct HeContext {
    params: Arc<BfvParameters>,
    keys: KeySet,
    scale: f64,
    id: String,
    security: String,
    rng: SharedRng,
}

impl HeContext {
    /// Generate a fresh parameter set with all four key roles
    pub fn generate(preset: FhePreset, scale: f64, rng: SharedRng) -> FheResult<Self> {
        Self::generate_with(&preset_params(preset), scale, rng)
    }

    pub fn generate_with(preset: &PresetParams, scale: f64, rng: SharedRng) -> FheResult<Self> {
        check_scale(scale)?;
        let params =
            build_bfv_params_arc(preset.degree, preset.plaintext_modulus, &preset.moduli)?;

        let keys = {
            let mut rng = lock(&rng)?;
            let sk = SecretKey::random(&params, &mut *rng);
            let pk = PublicKey::new(&sk, &mut *rng);
            let rk = RelinearizationKey::new(&sk, &mut *rng)?;
            let mut builder = EvaluationKeyBuilder::new(&sk)?;
            builder.enable_inner_sum()?;
            let ek = builder.build(&mut *rng)?;
            KeySet::new(Some(pk), Some(sk), Some(ek), Some(rk))
        };

        let id = context_id(&params, keys.encryption()?);
        debug!(
            "Generated encryption context {} (degree {})",
            id,
            params.degree()
        );

        Ok(Self {
            params,
            keys,
            scale,
            id,
            security: preset.security.to_string(),
            rng,
        })
    }

    /// Rebuild a public-only handle from a published context
    pub fn from_context(ctx: &EncryptionContext, rng: SharedRng) -> FheResult<Self> {
        check_scale(ctx.scale)?;
        let params = Arc::new(
            BfvParameters::try_deserialize(&ctx.params)
                .map_err(|e| FheError::Context(format!("invalid parameters: {e}")))?,
        );
        if params.degree() != ctx.degree || params.plaintext() != ctx.plaintext_modulus {
            return Err(FheError::Context(
                "parameters do not match the advertised degree and plaintext modulus".into(),
            ));
        }

        let pk = PublicKey::from_bytes(&ctx.keys.encryption, &params)?;
        let ek = EvaluationKey::from_bytes(&ctx.keys.galois, &params)?;
        let rk = RelinearizationKey::from_bytes(&ctx.keys.relinearization, &params)?;

        let id = context_id(&params, &pk);
        if id != ctx.id {
            return Err(FheError::Context(format!(
                "context id {} does not match its key material ({})",
                ctx.id, id
            )));
        }

        Ok(Self {
            params,
            keys: KeySet::new(Some(pk), None, Some(ek), Some(rk)),
            scale: ctx.scale,
            id,
            security: ctx.security.clone(),
            rng,
        })
    }

    /// Publishable view of this context. Never includes the secret key.
    pub fn encryption_context(&self) -> FheResult<EncryptionContext> {
        let moduli = self.params.moduli().to_vec();
        Ok(EncryptionContext {
            scheme: SCHEME.to_string(),
            security: self.security.clone(),
            degree: self.params.degree(),
            plaintext_modulus: self.params.plaintext(),
            bit_sizes: bit_sizes(&moduli),
            moduli,
            params: ArcBytes::from_bytes(self.params.to_bytes()),
            scale: self.scale,
            id: self.id.clone(),
            keys: PublicKeys {
                encryption: ArcBytes::from_bytes(self.keys.encryption()?.to_bytes()),
                galois: ArcBytes::from_bytes(self.keys.galois()?.to_bytes()),
                relinearization: ArcBytes::from_bytes(self.keys.relinearization()?.to_bytes()),
            },
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn degree(&self) -> usize {
        self.params.degree()
    }

    /// Number of real values one ciphertext carries
    pub fn slot_count(&self) -> usize {
        self.params.degree() / 2
    }

    pub fn has(&self, role: KeyRole) -> bool {
        self.keys.has(role)
    }

    /// Encode up to [`slot_count`](Self::slot_count) values at a fixed point scale.
    /// Unused slots are zero.
    pub fn encode(&self, values: &[f64], scale: f64) -> FheResult<ScaledPlaintext> {
        check_scale(scale)?;
        let capacity = self.slot_count();
        if values.len() > capacity {
            return Err(FheError::CapacityExceeded {
                len: values.len(),
                capacity,
            });
        }

        let bound = ((self.params.plaintext() - 1) / 2) as f64;
        let mut slots = vec![0i64; self.params.degree()];
        for (slot, value) in slots.iter_mut().zip(values) {
            let m = (value * scale).round();
            if !m.is_finite() || m.abs() > bound {
                return Err(FheError::Overflow {
                    value: *value,
                    scale,
                });
            }
            *slot = m as i64;
        }

        let plaintext = Plaintext::try_encode(slots.as_slice(), Encoding::simd(), &self.params)?;
        Ok(ScaledPlaintext { scale, plaintext })
    }

    /// Decode the data carrying slots back to real values
    pub fn decode(&self, pt: &ScaledPlaintext) -> FheResult<Vec<f64>> {
        check_scale(pt.scale)?;
        let slots = Vec::<i64>::try_decode(&pt.plaintext, Encoding::simd())?;
        Ok(slots
            .into_iter()
            .take(self.slot_count())
            .map(|m| m as f64 / pt.scale)
            .collect())
    }

    pub fn encrypt(&self, pt: &ScaledPlaintext) -> FheResult<Cipher> {
        let pk = self.keys.encryption()?;
        let ct = {
            let mut rng = lock(&self.rng)?;
            pk.try_encrypt(&pt.plaintext, &mut *rng)?
        };
        Ok(self.wrap(&ct, pt.scale))
    }

    pub fn decrypt(&self, cipher: &Cipher) -> FheResult<ScaledPlaintext> {
        let sk = self.keys.secret()?;
        let ct = self.load(cipher)?;
        let plaintext = sk.try_decrypt(&ct)?;
        Ok(ScaledPlaintext {
            scale: cipher.scale,
            plaintext,
        })
    }

    /// Encode at the context scale and encrypt
    pub fn encrypt_values(&self, values: &[f64]) -> FheResult<Cipher> {
        self.encrypt(&self.encode(values, self.scale)?)
    }

    pub fn decrypt_values(&self, cipher: &Cipher) -> FheResult<Vec<f64>> {
        self.decode(&self.decrypt(cipher)?)
    }

    pub fn add(&self, c1: &Cipher, c2: &Cipher) -> FheResult<Cipher> {
        check_compatible(c1, c2)?;
        let sum = &self.load(c1)? + &self.load(c2)?;
        Ok(self.wrap(&sum, c1.scale))
    }

    /// Slot-wise product summed across all slots. Every slot of the result holds the sum.
    pub fn dot_product(&self, c1: &Cipher, c2: &Cipher) -> FheResult<Cipher> {
        if c1.context_id != c2.context_id {
            return Err(FheError::IncompatibleContext {
                left: c1.context_id.clone(),
                right: c2.context_id.clone(),
            });
        }
        let (ek, rk) = (self.keys.galois()?, self.keys.relinearization()?);
        let (x, y) = (self.load(c1)?, self.load(c2)?);
        let summed = self.multiply_and_sum(&x, &y, ek, rk)?;
        Ok(self.wrap(&summed, c1.scale * c2.scale))
    }

    /// `sum((c1 - c2)^2)` when `c2` is given, otherwise `sum(c1^2)`
    pub fn squared_norm(&self, c1: &Cipher, c2: Option<&Cipher>) -> FheResult<Cipher> {
        let (ek, rk) = (self.keys.galois()?, self.keys.relinearization()?);
        let diff = match c2 {
            Some(c2) => {
                check_compatible(c1, c2)?;
                &self.load(c1)? - &self.load(c2)?
            }
            None => self.load(c1)?,
        };
        let summed = self.multiply_and_sum(&diff, &diff, ek, rk)?;
        Ok(self.wrap(&summed, c1.scale * c1.scale))
    }

    fn multiply_and_sum(
        &self,
        x: &Ciphertext,
        y: &Ciphertext,
        ek: &EvaluationKey,
        rk: &RelinearizationKey,
    ) -> FheResult<Ciphertext> {
        let mut product = x * y;
        rk.relinearizes(&mut product)?;
        trace!("relinearized product, summing slots");
        Ok(ek.computes_inner_sum(&product)?)
    }

    fn load(&self, cipher: &Cipher) -> FheResult<Ciphertext> {
        if cipher.context_id != self.id {
            return Err(FheError::IncompatibleContext {
                left: cipher.context_id.clone(),
                right: self.id.clone(),
            });
        }
        Ok(Ciphertext::from_bytes(&cipher.bytes, &self.params)?)
    }

    fn wrap(&self, ct: &Ciphertext, scale: f64) -> Cipher {
        Cipher {
            context_id: self.id.clone(),
            scale,
            bytes: ArcBytes::from_bytes(ct.to_bytes()),
        }
    }
}

impl std::fmt::Debug for HeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeContext")
            .field("id", &self.id)
            .field("degree", &self.params.degree())
            .field("scale", &self.scale)
            .field("keys", &self.keys)
            .finish()
    }
}

fn context_id(params: &BfvParameters, pk: &PublicKey) -> String {
    let mut material = params.to_bytes();
    material.extend(pk.to_bytes());
    digest_hex(material)
}

fn check_scale(scale: f64) -> FheResult<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(FheError::Context(format!("invalid fixed point scale {scale}")))
    }
}

fn check_compatible(c1: &Cipher, c2: &Cipher) -> FheResult<()> {
    if c1.context_id != c2.context_id {
        return Err(FheError::IncompatibleContext {
            left: c1.context_id.clone(),
            right: c2.context_id.clone(),
        });
    }
    if c1.scale != c2.scale {
        return Err(FheError::ScaleMismatch {
            left: c1.scale,
            right: c2.scale,
        });
    }
    Ok(())
}

fn lock(rng: &SharedRng) -> FheResult<MutexGuard<'_, ChaCha20Rng>> {
    rng.lock().map_err(|_| FheError::RngPoisoned)
}
