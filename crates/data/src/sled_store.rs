// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{DeleteState, GetState, PutState};
use actix::{Actor, Addr, Context, Handler};
use anyhow::{anyhow, Context as _, Result};
use once_cell::sync::Lazy;
use sled::{Db, Tree};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{error, info};

const WORLD_STATE: &str = "world_state";

/// sled refuses to open one path twice within a process, so open databases are shared
static OPEN_DBS: Lazy<Mutex<HashMap<PathBuf, Db>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn open_tree(path: &Path, tree: &str) -> Result<Tree> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Could not create db directory '{}'", path.display()))?;
    let key = path.canonicalize()?;
    let mut dbs = OPEN_DBS
        .lock()
        .map_err(|_| anyhow!("sled db cache lock poisoned"))?;
    let db = match dbs.get(&key) {
        Some(db) => db.clone(),
        None => {
            let db = sled::open(&key)
                .with_context(|| format!("Could not open database at '{}'", key.display()))?;
            if db.was_recovered() {
                info!("Recovered world state at {}", key.display());
            } else {
                info!("Created world state at {}", key.display());
            }
            dbs.insert(key, db.clone());
            db
        }
    };
    Ok(db.open_tree(tree)?)
}

/// Durable world state in a sled tree
pub struct SledStore {
    tree: Tree,
}

impl SledStore {
    pub fn new(path: &Path) -> Result<Addr<Self>> {
        Ok(Self {
            tree: open_tree(path, WORLD_STATE)?,
        }
        .start())
    }
}

impl Actor for SledStore {
    type Context = Context<Self>;
}

impl Handler<PutState> for SledStore {
    type Result = ();

    fn handle(&mut self, msg: PutState, _: &mut Self::Context) {
        if let Err(err) = self.tree.insert(&msg.key, msg.value) {
            error!(
                "Could not write {}: {err:?}",
                String::from_utf8_lossy(&msg.key)
            );
        }
    }
}

impl Handler<DeleteState> for SledStore {
    type Result = ();

    fn handle(&mut self, msg: DeleteState, _: &mut Self::Context) {
        if let Err(err) = self.tree.remove(&msg.key) {
            error!(
                "Could not delete {}: {err:?}",
                String::from_utf8_lossy(&msg.key)
            );
        }
    }
}

impl Handler<GetState> for SledStore {
    type Result = Option<Vec<u8>>;

    fn handle(&mut self, msg: GetState, _: &mut Self::Context) -> Self::Result {
        match self.tree.get(&msg.key) {
            Ok(value) => value.map(|v| v.to_vec()),
            Err(err) => {
                error!(
                    "Could not read {}: {err:?}",
                    String::from_utf8_lossy(&msg.key)
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataStore;
    use tempfile::tempdir;

    #[actix::test]
    async fn stores_on_one_path_share_state() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ledger");

        let first = SledStore::new(&path)?;
        first
            .send(PutState::new("gateway/sessions", b"one".to_vec()))
            .await?;

        let second = SledStore::new(&path)?;
        assert_eq!(
            second.send(GetState::new("gateway/sessions")).await?,
            Some(b"one".to_vec())
        );

        let other = SledStore::new(&dir.path().join("other"))?;
        assert_eq!(other.send(GetState::new("gateway/sessions")).await?, None);
        Ok(())
    }

    #[actix::test]
    async fn data_store_over_sled() -> Result<()> {
        let dir = tempdir()?;
        let addr = SledStore::new(&dir.path().join("db"))?;
        let store = DataStore::from(&addr).scope("defender/anomaly");

        store.write((0.5f64, 2u64));
        assert_eq!(store.read::<(f64, u64)>().await?, Some((0.5, 2)));
        store.clear();
        assert_eq!(store.read::<(f64, u64)>().await?, None);
        Ok(())
    }
}
