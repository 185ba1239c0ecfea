// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{DeleteState, GetState, IntoKey, PutState};
use actix::{Actor, Addr, Context, Handler, Recipient};
use anyhow::{Context as _, Result};
use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

/// Handle on one key of the world state.
///
/// Handles are cheap to clone and all share the store actor they were created from. Writes are
/// fire and forget; the actor applies them in the order they were sent, so a read sent after a
/// write observes it.
#[derive(Clone, Debug)]
pub struct DataStore {
    scope: Vec<u8>,
    get: Recipient<GetState>,
    put: Recipient<PutState>,
    delete: Recipient<DeleteState>,
}

impl DataStore {
    pub async fn read<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let Some(bytes) = self.get.send(GetState::new(&self.scope)).await? else {
            return Ok(None);
        };
        let value = bincode::deserialize(&bytes)
            .with_context(|| format!("Could not deserialize value at {}", self.key()))?;
        Ok(Some(value))
    }

    pub fn write<T: Serialize>(&self, value: T) {
        match bincode::serialize(&value) {
            Ok(bytes) => self.put.do_send(PutState::new(&self.scope, bytes)),
            Err(err) => error!("Could not serialize value for {}: {err}", self.key()),
        }
    }

    pub fn clear(&self) {
        self.delete.do_send(DeleteState::new(&self.scope))
    }

    /// The key this handle points at
    pub fn key(&self) -> String {
        String::from_utf8_lossy(&self.scope).into_owned()
    }

    /// Nested key, joined with a slash unless `key` starts with one
    pub fn scope<K: IntoKey>(&self, key: K) -> Self {
        let mut scope = self.scope.clone();
        let key = key.into_key();
        if !scope.is_empty() && !key.starts_with(b"/") {
            scope.push(b'/');
        }
        scope.extend(key);
        Self {
            scope,
            ..self.clone()
        }
    }

    /// Absolute key on the same store
    pub fn base<K: IntoKey>(&self, key: K) -> Self {
        Self {
            scope: key.into_key(),
            ..self.clone()
        }
    }
}

impl<A> From<&Addr<A>> for DataStore
where
    A: Actor<Context = Context<A>> + Handler<GetState> + Handler<PutState> + Handler<DeleteState>,
{
    fn from(addr: &Addr<A>) -> Self {
        Self {
            scope: vec![],
            get: addr.clone().recipient(),
            put: addr.clone().recipient(),
            delete: addr.clone().recipient(),
        }
    }
}
