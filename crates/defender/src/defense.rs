// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use hefl_protocol::CommittedModel;

/// Decides which committed models of a round take part in aggregation
pub trait PoisonDefense: Send + Sync {
    /// Ids of the benign models among `candidates`
    fn select_benign(&self, candidates: &[CommittedModel]) -> Vec<String>;
}

/// Accepts every committed model
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PoisonDefense for AcceptAll {
    fn select_benign(&self, candidates: &[CommittedModel]) -> Vec<String> {
        candidates.iter().map(|m| m.entry.id.clone()).collect()
    }
}

impl<F> PoisonDefense for F
where
    F: Fn(&[CommittedModel]) -> Vec<String> + Send + Sync,
{
    fn select_benign(&self, candidates: &[CommittedModel]) -> Vec<String> {
        self(candidates)
    }
}
