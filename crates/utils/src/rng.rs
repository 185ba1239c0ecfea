// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{anyhow, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::{Arc, Mutex};

pub type SharedRng = Arc<Mutex<ChaCha20Rng>>;

/// Shared cryptographic RNG seeded from OS entropy
pub fn create_shared_rng() -> SharedRng {
    Arc::new(Mutex::new(ChaCha20Rng::from_entropy()))
}

/// Deterministic shared RNG
pub fn create_shared_rng_from_u64(seed: u64) -> SharedRng {
    Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed)))
}

/// Run a closure with exclusive access to the shared RNG
pub fn with_rng<T>(rng: &SharedRng, f: impl FnOnce(&mut ChaCha20Rng) -> T) -> Result<T> {
    let mut guard = rng.lock().map_err(|_| anyhow!("Shared RNG mutex was poisoned"))?;
    Ok(f(&mut guard))
}
