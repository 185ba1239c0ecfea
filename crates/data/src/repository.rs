// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::DataStore;
use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::{marker::PhantomData, ops::Deref};

/// A world state key known to hold a `T`
#[derive(Debug)]
pub struct Repository<T> {
    store: DataStore,
    _p: PhantomData<T>,
}

impl<T> Repository<T> {
    pub fn new(store: DataStore) -> Self {
        Self {
            store,
            _p: PhantomData,
        }
    }
}

impl<T: DeserializeOwned + Serialize> Repository<T> {
    pub async fn read(&self) -> Result<Option<T>> {
        self.store.read().await
    }

    pub fn write(&self, value: &T) {
        self.store.write(value)
    }
}

impl<T> Deref for Repository<T> {
    type Target = DataStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

/// Root that service crates hang their repository factories off, for example
/// `store.repositories().sessions()`
pub struct Repositories {
    pub store: DataStore,
}

pub trait RepositoriesFactory {
    fn repositories(&self) -> Repositories;
}

impl RepositoriesFactory for DataStore {
    fn repositories(&self) -> Repositories {
        Repositories {
            store: self.clone(),
        }
    }
}
