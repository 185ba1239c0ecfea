// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::IntoKey;
use actix::Message;

/// Fire and forget write of a world state value
#[derive(Message, Clone, Debug, PartialEq, Eq)]
#[rtype(result = "()")]
pub struct PutState {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl PutState {
    pub fn new<K: IntoKey>(key: K, value: Vec<u8>) -> Self {
        Self {
            key: key.into_key(),
            value,
        }
    }
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
#[rtype(result = "Option<Vec<u8>>")]
pub struct GetState {
    pub key: Vec<u8>,
}

impl GetState {
    pub fn new<K: IntoKey>(key: K) -> Self {
        Self {
            key: key.into_key(),
        }
    }
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
#[rtype(result = "()")]
pub struct DeleteState {
    pub key: Vec<u8>,
}

impl DeleteState {
    pub fn new<K: IntoKey>(key: K) -> Self {
        Self {
            key: key.into_key(),
        }
    }
}
