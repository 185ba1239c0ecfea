// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{DeleteState, GetState, PutState};
use actix::{Actor, Context, Handler, Message};
use std::collections::BTreeMap;

/// A write as it was applied
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateWrite {
    Put(PutState),
    Delete(DeleteState),
}

/// Every write applied so far, oldest first. Empty unless journaling was enabled.
#[derive(Message, Clone, Debug)]
#[rtype(result = "Vec<StateWrite>")]
pub struct GetJournal;

/// Volatile world state for tests and for federations configured with `data.in_mem`
pub struct InMemStore {
    state: BTreeMap<Vec<u8>, Vec<u8>>,
    journal: Option<Vec<StateWrite>>,
}

impl InMemStore {
    pub fn new(journal: bool) -> Self {
        Self {
            state: BTreeMap::new(),
            journal: journal.then(Vec::new),
        }
    }

    fn record(&mut self, write: StateWrite) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(write);
        }
    }
}

impl Actor for InMemStore {
    type Context = Context<Self>;
}

impl Handler<PutState> for InMemStore {
    type Result = ();

    fn handle(&mut self, msg: PutState, _: &mut Self::Context) {
        self.state.insert(msg.key.clone(), msg.value.clone());
        self.record(StateWrite::Put(msg));
    }
}

impl Handler<DeleteState> for InMemStore {
    type Result = ();

    fn handle(&mut self, msg: DeleteState, _: &mut Self::Context) {
        self.state.remove(&msg.key);
        self.record(StateWrite::Delete(msg));
    }
}

impl Handler<GetState> for InMemStore {
    type Result = Option<Vec<u8>>;

    fn handle(&mut self, msg: GetState, _: &mut Self::Context) -> Self::Result {
        self.state.get(&msg.key).cloned()
    }
}

impl Handler<GetJournal> for InMemStore {
    type Result = Vec<StateWrite>;

    fn handle(&mut self, _: GetJournal, _: &mut Self::Context) -> Self::Result {
        self.journal.clone().unwrap_or_default()
    }
}
