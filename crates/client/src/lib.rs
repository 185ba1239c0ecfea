// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! What a federation participant runs: mask a trained model with a random offset, encrypt it
//! under the session's public context and upload it in transaction sized parts.

mod client;
mod error;
mod masking;

pub use client::*;
pub use error::*;
pub use masking::*;
