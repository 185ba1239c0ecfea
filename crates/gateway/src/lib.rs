// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! The Gateway owns the session history, the global model and the per round registries of
//! committed local models. It only ever holds public key material; every decryption goes
//! through the Defender.

mod aggregation;
mod error;
mod gateway;
mod repo;
mod scoring;

pub use aggregation::*;
pub use error::*;
pub use gateway::*;
pub use repo::*;
pub use scoring::*;
