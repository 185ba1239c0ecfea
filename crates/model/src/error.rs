// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Tensor for layer '{0}' is ragged")]
    Ragged(String),

    #[error("Unknown layer template '{0}'")]
    UnknownTemplate(String),

    #[error("Expected {expected} values to reassemble the model but got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("{shapes} shape descriptors but only {layers} layer names")]
    MissingLayerNames { shapes: usize, layers: usize },

    #[error("Invalid series marker '{0}'")]
    BadSeriesMarker(String),

    #[error("Series is incomplete, have {have} of {total} parts")]
    IncompleteSeries { have: usize, total: usize },

    #[error("Series marker {marker} does not belong to a series of {total} parts")]
    ForeignSeriesPart { marker: String, total: usize },
}
