// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use hefl_protocol::SessionRecord;

/// Share of the pool kept as contract reward before anomalies decay it
const CONTRACT_SHARE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rewards {
    /// Contract reward
    pub rc: f64,
    /// Training reward per round
    pub rt: f64,
}

/// Contract reward decays with accumulated anomalies `phi` relative to the number of sessions
/// seen so far; whatever is left of the pool is split evenly over the session's rounds.
pub fn calculate_rewards(sessions: usize, phi: u64, current: &SessionRecord) -> Rewards {
    let total = current.rounds.total();
    if total == 0 {
        return Rewards { rc: 0.0, rt: 0.0 };
    }
    let decay = (-(phi as f64) / sessions.max(1) as f64).exp();
    let rc = current.reward * CONTRACT_SHARE * decay;
    let rt = (current.reward - rc) / total as f64;
    Rewards { rc, rt }
}
