// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Homomorphic encryption core.
//!
//! Real valued vectors are carried in BFV SIMD slots as fixed point integers. The fixed point
//! scale travels with every plaintext and ciphertext so that products, which multiply scales,
//! decode correctly. Only the first `degree / 2` slots carry data.

mod cipher;
mod context;
mod error;
mod he;
mod keys;
mod params;

pub use cipher::*;
pub use context::*;
pub use error::*;
pub use he::*;
pub use keys::*;
pub use params::*;
