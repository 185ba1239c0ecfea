// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("No training session has been initialized")]
    NoSession,
    #[error("Incompatible models: global has {global} chunks, local has {local}")]
    IncompatibleShape { global: usize, local: usize },
    #[error("No chunks were stored for model {0}")]
    UnknownSeries(String),
    #[error("Model {id} was stored in {stored} transactions but committed with {committed}")]
    SeriesLength {
        id: String,
        stored: usize,
        committed: usize,
    },
}
