// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    AnomalyRecord, Args, BenignSetRecord, CommittedModel, ModelStructure, Operation,
    ProtocolError, RewardRecord, RoundCounter, SessionRecord,
};
use hefl_fhe::{Cipher, EncryptionContext};
use hefl_model::SeriesMarker;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A typed request for one [`Operation`] and the payload it answers with
pub trait Call: Sized {
    const OPERATION: Operation;
    type Response: Serialize + DeserializeOwned;

    fn to_args(&self) -> anyhow::Result<Vec<String>>;
    fn from_args(args: &mut Args<'_>) -> Result<Self, ProtocolError>;
}

fn json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string(value)?)
}

macro_rules! no_args_call {
    ($name:ident, $op:expr, $response:ty) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name;

        impl Call for $name {
            const OPERATION: Operation = $op;
            type Response = $response;

            fn to_args(&self) -> anyhow::Result<Vec<String>> {
                Ok(vec![])
            }

            fn from_args(_: &mut Args<'_>) -> Result<Self, ProtocolError> {
                Ok($name)
            }
        }
    };
}

/// Response of operations that only have side effects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq)]
pub struct InitSession {
    pub model_name: String,
    pub model_type: String,
    pub rounds: usize,
    pub reward: f64,
    pub chunk_limit: usize,
}

impl Call for InitSession {
    const OPERATION: Operation = Operation::InitSession;
    type Response = Empty;

    fn to_args(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec![
            json(&self.model_name)?,
            json(&self.model_type)?,
            json(&self.rounds)?,
            json(&self.reward)?,
            json(&self.chunk_limit)?,
        ])
    }

    fn from_args(args: &mut Args<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            model_name: args.next()?,
            model_type: args.next()?,
            rounds: args.next()?,
            reward: args.next()?,
            chunk_limit: args.next()?,
        })
    }
}

no_args_call!(
    GetEncryptionContext,
    Operation::GetEncryptionContext,
    EncryptionContext
);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sessions {
    pub sessions: Vec<SessionRecord>,
}

no_args_call!(GetTrainingSessions, Operation::GetTrainingSessions, Sessions);

#[derive(Debug, Clone, PartialEq)]
pub struct StoreLocalModelChunk {
    pub id: String,
    pub chunk: Vec<Cipher>,
    pub series: SeriesMarker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub completed: SeriesMarker,
}

impl Call for StoreLocalModelChunk {
    const OPERATION: Operation = Operation::StoreLocalModelChunk;
    type Response = StoredChunk;

    fn to_args(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec![
            json(&self.id)?,
            json(&self.chunk)?,
            json(&self.series)?,
        ])
    }

    fn from_args(args: &mut Args<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: args.next()?,
            chunk: args.next()?,
            series: args.next()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitLocalModel {
    pub id: String,
    pub delta: Cipher,
    pub series_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub score: f64,
}

impl Call for CommitLocalModel {
    const OPERATION: Operation = Operation::CommitLocalModel;
    type Response = Score;

    fn to_args(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec![
            json(&self.id)?,
            json(&self.delta)?,
            json(&self.series_length)?,
        ])
    }

    fn from_args(args: &mut Args<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: args.next()?,
            delta: args.next()?,
            series_length: args.next()?,
        })
    }
}

/// The global model as clients see it: plaintext chunks plus how to reassemble them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalModelView {
    pub id: String,
    pub model: Vec<Vec<f64>>,
    pub structure: ModelStructure,
}

no_args_call!(GetGlobalModel, Operation::GetGlobalModel, GlobalModelView);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommittedModels {
    pub models: Vec<CommittedModel>,
}

no_args_call!(
    GetCommittedLocalModels,
    Operation::GetCommittedLocalModels,
    CommittedModels
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivateAggregation {
    pub chunk_limit: usize,
}

/// What an aggregation did. Serializes to `{}` when the session was already complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationOutcome {
    /// Round counter after the aggregation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<RoundCounter>,
    /// Id of the newly published global model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

impl Call for PrivateAggregation {
    const OPERATION: Operation = Operation::PrivateAggregation;
    type Response = AggregationOutcome;

    fn to_args(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec![json(&self.chunk_limit)?])
    }

    fn from_args(args: &mut Args<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            chunk_limit: args.next()?,
        })
    }
}

no_args_call!(
    InitEncryptionContext,
    Operation::InitEncryptionContext,
    EncryptionContext
);

#[derive(Debug, Clone, PartialEq)]
pub struct GuardedDecrypt {
    pub ciphers: Vec<Cipher>,
    pub context_id: String,
    pub contributors: usize,
    /// Encrypted noise offsets of the contributors, needed for per slot aggregates
    pub deltas: Vec<Cipher>,
    /// Session history, enables reward accounting on refusal
    pub sessions: Option<Vec<SessionRecord>>,
}

/// One recovered result. Flat vectors collapse to their mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recovered {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Recovered {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Recovered::Scalar(v) => Some(*v),
            Recovered::Vector(_) => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Recovered::Scalar(v) => *v == 0.0,
            Recovered::Vector(values) => values.iter().all(|v| *v == 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveredValues {
    pub values: Vec<Recovered>,
}

impl Call for GuardedDecrypt {
    const OPERATION: Operation = Operation::GuardedDecrypt;
    type Response = RecoveredValues;

    fn to_args(&self) -> anyhow::Result<Vec<String>> {
        let mut args = vec![
            json(&self.ciphers)?,
            json(&self.context_id)?,
            json(&self.contributors)?,
            json(&self.deltas)?,
        ];
        if let Some(sessions) = &self.sessions {
            args.push(json(sessions)?);
        }
        Ok(args)
    }

    fn from_args(args: &mut Args<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            ciphers: args.next()?,
            context_id: args.next()?,
            contributors: args.next()?,
            deltas: args.next()?,
            sessions: args.optional()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenignIds {
    pub ids: Vec<String>,
}

no_args_call!(GetBenignModelIds, Operation::GetBenignModelIds, BenignIds);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoisonDefenseOutcome {
    pub anomaly: AnomalyRecord,
    pub benign: BenignSetRecord,
    pub reward: RewardRecord,
}

no_args_call!(
    ApplyPoisonDefense,
    Operation::ApplyPoisonDefense,
    PoisonDefenseOutcome
);
