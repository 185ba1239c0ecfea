// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Caller, Operation, Service};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("Operation {operation} is not served by the {service}")]
    WrongService {
        operation: Operation,
        service: Service,
    },
    #[error("Operation {operation} may not be invoked by {caller}")]
    Forbidden { operation: Operation, caller: Caller },
    #[error("Operation {operation} takes {expected} arguments but {actual} were given")]
    Arity {
        operation: Operation,
        expected: usize,
        actual: usize,
    },
    #[error("Argument {index} of {operation} is malformed: {reason}")]
    MalformedArgument {
        operation: Operation,
        index: usize,
        reason: String,
    },
    #[error("Response payload is malformed: {0}")]
    MalformedPayload(String),
    #[error("{operation} failed: {reason}")]
    CalleeFailed { operation: Operation, reason: String },
}
