// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use hefl_fhe::Cipher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rounds left out of the rounds a session started with, written `remaining/total`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoundCounter {
    remaining: usize,
    total: usize,
}

impl RoundCounter {
    pub fn new(total: usize) -> Self {
        Self {
            remaining: total,
            total,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// The counter after one more round, or `None` once no rounds are left
    pub fn advance(&self) -> Option<Self> {
        Some(Self {
            remaining: self.remaining.checked_sub(1)?,
            total: self.total,
        })
    }
}

impl fmt::Display for RoundCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.remaining, self.total)
    }
}

impl FromStr for RoundCounter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("'{s}' is not a remaining/total round counter");
        let (remaining, total) = s.split_once('/').ok_or_else(bad)?;
        let remaining: usize = remaining.trim().parse().map_err(|_| bad())?;
        let total: usize = total.trim().parse().map_err(|_| bad())?;
        if remaining > total {
            return Err(bad());
        }
        Ok(Self { remaining, total })
    }
}

impl TryFrom<String> for RoundCounter {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoundCounter> for String {
    fn from(value: RoundCounter) -> Self {
        value.to_string()
    }
}

/// One entry of the append-only session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Digest of the session owner's identity
    pub owner: String,
    pub context_id: String,
    pub rounds: RoundCounter,
    /// Total reward pool
    pub reward: f64,
    pub model_name: String,
    pub model_type: String,
}

/// What is needed to turn flat aggregate values back into named tensors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStructure {
    pub model_type: String,
    pub layers: Vec<String>,
    pub shapes: Vec<Vec<usize>>,
}

/// The published global model. Replaced whole at the end of a successful round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalModelRecord {
    /// Content digest of the plaintext chunks
    pub id: String,
    pub plain: Vec<Vec<f64>>,
    pub structure: ModelStructure,
    /// Number of encrypted chunks stored next to this record
    pub series_length: usize,
}

/// A committed local model of the current round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalModelEntry {
    /// Digest of the committing client's identity
    pub client: String,
    pub id: String,
    /// Encrypted noise offset, the same value in every slot
    pub delta: Cipher,
    pub series_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: String,
    pub score: f64,
}

/// A registry entry joined with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedModel {
    #[serde(flatten)]
    pub entry: LocalModelEntry,
    pub score: f64,
}

/// Contract reward share and the anomaly counter it was computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub rc: f64,
    pub phi: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenignSetRecord {
    pub benign: Vec<String>,
    pub malicious: Vec<String>,
}

/// Training reward share per benign participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub rt: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_counter_counts_down() {
        let rounds = RoundCounter::new(2);
        assert_eq!(rounds.to_string(), "2/2");

        let Some(once) = rounds.advance() else {
            panic!("first round must advance");
        };
        assert_eq!(once.to_string(), "1/2");

        let Some(done) = once.advance() else {
            panic!("second round must advance");
        };
        assert!(done.is_complete());
        assert_eq!(done.advance(), None);
    }

    #[test]
    fn round_counter_is_a_string_on_the_wire() -> anyhow::Result<()> {
        let json = serde_json::to_string(&RoundCounter::new(3))?;
        assert_eq!(json, "\"3/3\"");
        let back: RoundCounter = serde_json::from_str("\"1/3\"")?;
        assert_eq!(back.remaining(), 1);
        assert!(serde_json::from_str::<RoundCounter>("\"4/3\"").is_err());
        assert!(serde_json::from_str::<RoundCounter>("\"x\"").is_err());
        Ok(())
    }
}
