// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Service {
    #[strum(to_string = "Gateway")]
    Gateway,
    #[strum(to_string = "Defender")]
    Defender,
}

/// Every named operation either service exposes
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    InitSession,
    GetEncryptionContext,
    GetTrainingSessions,
    StoreLocalModelChunk,
    CommitLocalModel,
    GetGlobalModel,
    GetCommittedLocalModels,
    PrivateAggregation,
    InitEncryptionContext,
    GuardedDecrypt,
    GetBenignModelIds,
    ApplyPoisonDefense,
}

impl Operation {
    pub fn service(&self) -> Service {
        use Operation::*;
        match self {
            InitSession
            | GetEncryptionContext
            | GetTrainingSessions
            | StoreLocalModelChunk
            | CommitLocalModel
            | GetGlobalModel
            | GetCommittedLocalModels
            | PrivateAggregation => Service::Gateway,
            InitEncryptionContext | GuardedDecrypt | GetBenignModelIds | ApplyPoisonDefense => {
                Service::Defender
            }
        }
    }

    /// Operations only the other service may call
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Operation::InitEncryptionContext
                | Operation::GuardedDecrypt
                | Operation::GetBenignModelIds
        )
    }
}
