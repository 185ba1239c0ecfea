// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use hefl_config::StoreKeys;
use hefl_data::{Repositories, Repository};
use hefl_protocol::{AnomalyRecord, BenignSetRecord, RewardRecord};

pub trait DefenderRepositoryFactory {
    fn anomaly(&self) -> Repository<AnomalyRecord>;
    fn benign(&self) -> Repository<BenignSetRecord>;
    fn reward(&self) -> Repository<RewardRecord>;
}

impl DefenderRepositoryFactory for Repositories {
    fn anomaly(&self) -> Repository<AnomalyRecord> {
        Repository::new(self.store.scope(StoreKeys::anomaly()))
    }

    fn benign(&self) -> Repository<BenignSetRecord> {
        Repository::new(self.store.scope(StoreKeys::benign()))
    }

    fn reward(&self) -> Repository<RewardRecord> {
        Repository::new(self.store.scope(StoreKeys::reward()))
    }
}
