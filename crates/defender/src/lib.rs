// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! The Defender is the only holder of the secret key. It decrypts nothing but flat sums and
//! multi-contributor aggregates, keeps the anomaly counter and settles rewards.

mod defender;
mod defense;
mod error;
mod guard;
mod repo;
mod rewards;

pub use defender::*;
pub use defense::*;
pub use error::*;
pub use guard::*;
pub use repo::*;
pub use rewards::*;
