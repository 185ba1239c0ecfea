// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Call, Operation, ProtocolError, Service};
use actix::Message;
use hefl_utils::{abbreviate, identity_digest};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who issued an invocation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Caller {
    /// An external participant, identified by its raw identity (usually a certificate)
    Client(String),
    Service(Service),
}

impl Caller {
    pub fn client(identity: impl Into<String>) -> Self {
        Caller::Client(identity.into())
    }

    /// Content digest of the caller identity. Raw identities are never stored.
    pub fn digest(&self) -> String {
        match self {
            Caller::Client(identity) => identity_digest(identity),
            Caller::Service(service) => identity_digest(&service.to_string()),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caller::Client(_) => write!(f, "client {}", abbreviate(&self.digest(), 6)),
            Caller::Service(service) => write!(f, "the {service} service"),
        }
    }
}

/// Invoke a named operation with ordered JSON encoded arguments.
///
/// Handlers answer with a framed payload, see [`crate::frame`].
#[derive(Message, Debug, Clone, PartialEq)]
#[rtype(result = "anyhow::Result<String>")]
pub struct Invoke {
    pub operation: Operation,
    pub args: Vec<String>,
    pub caller: Caller,
}

impl Invoke {
    pub fn new(operation: Operation, caller: Caller) -> Self {
        Self {
            operation,
            args: vec![],
            caller,
        }
    }

    /// Build an invocation from an operation name as it arrives at the ledger boundary
    pub fn parse(name: &str, args: Vec<String>, caller: Caller) -> Result<Self, ProtocolError> {
        let operation = Operation::from_str(name)
            .map_err(|_| ProtocolError::UnknownOperation(name.to_string()))?;
        Ok(Self {
            operation,
            args,
            caller,
        })
    }

    pub fn call<C: Call>(request: &C, caller: Caller) -> anyhow::Result<Self> {
        Ok(Self {
            operation: C::OPERATION,
            args: request.to_args()?,
            caller,
        })
    }

    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> anyhow::Result<Self> {
        self.args.push(serde_json::to_string(value)?);
        Ok(self)
    }

    /// Check that `service` serves this operation and that the caller may invoke it there
    pub fn authorize(&self, service: Service) -> Result<(), ProtocolError> {
        if self.operation.service() != service {
            return Err(ProtocolError::WrongService {
                operation: self.operation,
                service,
            });
        }
        if self.operation.is_internal() {
            match &self.caller {
                Caller::Service(from) if *from != service => {}
                _ => {
                    return Err(ProtocolError::Forbidden {
                        operation: self.operation,
                        caller: self.caller.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Decode the arguments as the typed request `C`. All arguments must be consumed.
    pub fn decode<C: Call>(&self) -> Result<C, ProtocolError> {
        if self.operation != C::OPERATION {
            return Err(ProtocolError::UnknownOperation(format!(
                "{} decoded as {}",
                self.operation,
                C::OPERATION
            )));
        }
        let mut args = Args::new(self.operation, &self.args);
        let request = C::from_args(&mut args)?;
        args.finish()?;
        Ok(request)
    }
}

/// Sequential reader over the arguments of one invocation
pub struct Args<'a> {
    operation: Operation,
    args: &'a [String],
    next: usize,
}

impl<'a> Args<'a> {
    pub fn new(operation: Operation, args: &'a [String]) -> Self {
        Self {
            operation,
            args,
            next: 0,
        }
    }

    pub fn next<T: DeserializeOwned>(&mut self) -> Result<T, ProtocolError> {
        let index = self.next;
        let raw = self.args.get(index).ok_or(ProtocolError::Arity {
            operation: self.operation,
            expected: index + 1,
            actual: self.args.len(),
        })?;
        self.next += 1;
        serde_json::from_str(raw).map_err(|e| ProtocolError::MalformedArgument {
            operation: self.operation,
            index,
            reason: e.to_string(),
        })
    }

    /// Trailing argument that may be left out
    pub fn optional<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ProtocolError> {
        if self.next >= self.args.len() {
            return Ok(None);
        }
        self.next()
    }

    pub fn finish(self) -> Result<(), ProtocolError> {
        if self.next != self.args.len() {
            return Err(ProtocolError::Arity {
                operation: self.operation,
                expected: self.next,
                actual: self.args.len(),
            });
        }
        Ok(())
    }
}
