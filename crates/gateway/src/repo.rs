// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use hefl_config::StoreKeys;
use hefl_data::{Repositories, Repository};
use hefl_fhe::{Cipher, EncryptionContext};
use hefl_model::ChunkSeries;
use hefl_protocol::{GlobalModelRecord, LocalModelEntry, ScoreEntry, SessionRecord};
use std::collections::BTreeMap;

/// Local model uploads keyed by model id
pub type StagedChunks = BTreeMap<String, ChunkSeries<Cipher>>;

pub trait GatewayRepositoryFactory {
    fn sessions(&self) -> Repository<Vec<SessionRecord>>;
    fn encryption_context(&self) -> Repository<EncryptionContext>;
    fn global_model(&self) -> Repository<GlobalModelRecord>;
    fn global_chunks(&self) -> Repository<ChunkSeries<Cipher>>;
    fn local_models(&self) -> Repository<Vec<LocalModelEntry>>;
    fn scores(&self) -> Repository<Vec<ScoreEntry>>;
    fn staged_chunks(&self) -> Repository<StagedChunks>;
}

impl GatewayRepositoryFactory for Repositories {
    fn sessions(&self) -> Repository<Vec<SessionRecord>> {
        Repository::new(self.store.scope(StoreKeys::sessions()))
    }

    fn encryption_context(&self) -> Repository<EncryptionContext> {
        Repository::new(self.store.scope(StoreKeys::encryption_context()))
    }

    fn global_model(&self) -> Repository<GlobalModelRecord> {
        Repository::new(self.store.scope(StoreKeys::global_model()))
    }

    fn global_chunks(&self) -> Repository<ChunkSeries<Cipher>> {
        Repository::new(self.store.scope(StoreKeys::global_chunks()))
    }

    fn local_models(&self) -> Repository<Vec<LocalModelEntry>> {
        Repository::new(self.store.scope(StoreKeys::local_models()))
    }

    fn scores(&self) -> Repository<Vec<ScoreEntry>> {
        Repository::new(self.store.scope(StoreKeys::scores()))
    }

    fn staged_chunks(&self) -> Repository<StagedChunks> {
        Repository::new(self.store.scope(StoreKeys::staged_chunks()))
    }
}
