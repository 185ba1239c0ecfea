// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Actor, Context, Handler, Message};
use anyhow::{anyhow, Result};
use hefl_protocol::{frame, Invoke, Operation, Service};
use serde::Serialize;
use std::collections::HashMap;

/// Answers invocations with canned payloads and records what it was asked
pub struct StubService {
    service: Service,
    responses: HashMap<Operation, String>,
    received: Vec<Invoke>,
}

impl StubService {
    pub fn new(service: Service) -> Self {
        Self {
            service,
            responses: HashMap::new(),
            received: vec![],
        }
    }

    pub fn respond_with<T: Serialize>(mut self, operation: Operation, payload: &T) -> Result<Self> {
        self.responses
            .insert(operation, serde_json::to_string(payload)?);
        Ok(self)
    }
}

impl Actor for StubService {
    type Context = Context<Self>;
}

impl Handler<Invoke> for StubService {
    type Result = Result<String>;

    fn handle(&mut self, msg: Invoke, _: &mut Self::Context) -> Self::Result {
        msg.authorize(self.service)?;
        let operation = msg.operation;
        self.received.push(msg);
        self.responses
            .get(&operation)
            .map(|payload| frame(payload))
            .ok_or_else(|| anyhow!("stub has no response for {operation}"))
    }
}

/// Every invocation the stub received, in order
#[derive(Message)]
#[rtype(result = "Vec<Invoke>")]
pub struct GetReceived;

impl Handler<GetReceived> for StubService {
    type Result = Vec<Invoke>;

    fn handle(&mut self, _: GetReceived, _: &mut Self::Context) -> Self::Result {
        self.received.clone()
    }
}
