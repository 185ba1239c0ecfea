// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::Repository;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub trait PersistableData: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}
impl<T> PersistableData for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Lets a repository hand out a write through container for its record
#[async_trait]
pub trait AutoPersist<T: PersistableData> {
    /// Container holding whatever is stored, possibly nothing
    async fn load(&self) -> Result<Persistable<T>>;
    /// Container holding the stored record, or `default` which is then written back
    async fn load_or_default(&self, default: T) -> Result<Persistable<T>>;
}

#[async_trait]
impl<T: PersistableData> AutoPersist<T> for Repository<T> {
    async fn load(&self) -> Result<Persistable<T>> {
        Ok(Persistable {
            data: self.read().await?,
            repo: self.clone(),
        })
    }

    async fn load_or_default(&self, default: T) -> Result<Persistable<T>> {
        let data = self.read().await?.unwrap_or(default);
        self.write(&data);
        Ok(Persistable {
            data: Some(data),
            repo: self.clone(),
        })
    }
}

/// A service owned record.
///
/// The store is read once when the container is loaded. After that reads are served from
/// memory and every change is written through, so services can mutate their records from
/// synchronous handler code.
#[derive(Debug)]
pub struct Persistable<T> {
    data: Option<T>,
    repo: Repository<T>,
}

impl<T: PersistableData> Persistable<T> {
    pub fn get(&self) -> Option<T> {
        self.data.clone()
    }

    pub fn try_get(&self) -> Result<T> {
        self.data
            .clone()
            .ok_or_else(|| anyhow!("No record at {}", self.repo.key()))
    }

    /// Borrow the record, failing when there is none
    pub fn try_with<F, U>(&self, f: F) -> Result<U>
    where
        F: FnOnce(&T) -> Result<U>,
    {
        match &self.data {
            Some(data) => f(data),
            None => Err(anyhow!("No record at {}", self.repo.key())),
        }
    }

    pub fn set(&mut self, data: T) {
        self.repo.write(&data);
        self.data = Some(data);
    }

    /// Replace the record with what `mutator` makes of it. Nothing changes, in memory or in
    /// the store, if there is no record or the mutator fails.
    pub fn try_mutate<F>(&mut self, mutator: F) -> Result<()>
    where
        F: FnOnce(T) -> Result<T>,
    {
        let data = mutator(self.try_get()?)?;
        self.set(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{AutoPersist, DataStore, GetJournal, InMemStore, Repository};
    use actix::{Actor, Addr};
    use anyhow::{anyhow, Result};

    fn repo() -> (Repository<Vec<String>>, Addr<InMemStore>) {
        let addr = InMemStore::new(true).start();
        (Repository::new(DataStore::from(&addr).scope("models")), addr)
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[actix::test]
    async fn default_is_written_back() -> Result<()> {
        let (repo, addr) = repo();
        let container = repo.load_or_default(names(&["mnist"])).await?;

        assert_eq!(container.get(), Some(names(&["mnist"])));
        assert_eq!(repo.read().await?, Some(names(&["mnist"])));
        assert_eq!(addr.send(GetJournal).await?.len(), 1);
        Ok(())
    }

    #[actix::test]
    async fn stored_record_wins_over_default() -> Result<()> {
        let (repo, _) = repo();
        repo.write(&names(&["mnist"]));
        let container = repo.load_or_default(names(&["cifar"])).await?;
        assert_eq!(container.get(), Some(names(&["mnist"])));
        Ok(())
    }

    #[actix::test]
    async fn empty_container_refuses_mutation() -> Result<()> {
        let (repo, addr) = repo();
        let mut container = repo.load().await?;
        assert_eq!(container.get(), None);
        assert!(container.try_with(|d| Ok(d.len())).is_err());
        assert!(container.try_mutate(Ok).is_err());
        assert!(addr.send(GetJournal).await?.is_empty());

        container.set(names(&["a"]));
        assert_eq!(container.try_with(|d| Ok(d.len()))?, 1);
        Ok(())
    }

    #[actix::test]
    async fn mutation_writes_through() -> Result<()> {
        let (repo, addr) = repo();
        let mut container = repo.load_or_default(names(&["a"])).await?;

        container.try_mutate(|mut list| {
            list.push("b".to_string());
            Ok(list)
        })?;

        assert_eq!(repo.read().await?, Some(names(&["a", "b"])));
        assert_eq!(addr.send(GetJournal).await?.len(), 2);
        Ok(())
    }

    #[actix::test]
    async fn failed_mutation_changes_nothing() -> Result<()> {
        let (repo, _) = repo();
        let mut container = repo.load_or_default(names(&["a"])).await?;

        let result = container.try_mutate(|_| -> Result<Vec<String>> { Err(anyhow!("nope")) });

        assert!(result.is_err());
        assert_eq!(container.try_get()?, names(&["a"]));
        assert_eq!(repo.read().await?, Some(names(&["a"])));
        Ok(())
    }
}
