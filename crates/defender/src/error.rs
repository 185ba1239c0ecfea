// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefenderError {
    #[error("No encryption context has been initialized")]
    NoContext,
    #[error("Expected {expected} noise offsets for {expected} contributors, got {actual}")]
    DeltaCount { expected: usize, actual: usize },
    #[error("No training session has been started")]
    NoSession,
}
