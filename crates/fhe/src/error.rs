// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::KeyRole;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FheError {
    #[error("Encryption context error: {0}")]
    Context(String),

    #[error("Missing {0} key")]
    MissingKey(KeyRole),

    #[error("Operands belong to different encryption contexts ({left} != {right})")]
    IncompatibleContext { left: String, right: String },

    #[error("Operand scales differ ({left} != {right})")]
    ScaleMismatch { left: f64, right: f64 },

    #[error("{len} values do not fit into {capacity} slots")]
    CapacityExceeded { len: usize, capacity: usize },

    #[error("Value {value} cannot be encoded at scale {scale}")]
    Overflow { value: f64, scale: f64 },

    #[error("Shared RNG mutex was poisoned")]
    RngPoisoned,

    #[error(transparent)]
    Backend(#[from] fhe::Error),
}

pub type FheResult<T> = Result<T, FheError>;
