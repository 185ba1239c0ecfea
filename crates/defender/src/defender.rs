// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    calculate_rewards, release, DefenderError, DefenderRepositoryFactory, PoisonDefense, Release,
};
use actix::prelude::*;
use anyhow::{bail, Result};
use hefl_config::FheConfig;
use hefl_data::{AutoPersist, DataStore, Persistable, RepositoriesFactory};
use hefl_fhe::{EncryptionContext, FheError, HeContext};
use hefl_protocol::{
    respond, AnomalyRecord, ApplyPoisonDefense, BenignIds, BenignSetRecord, CommittedModel,
    GatewayLink, GetBenignModelIds, GuardedDecrypt, InitEncryptionContext, Invoke, Operation,
    PoisonDefenseOutcome, Recovered, RecoveredValues, RewardRecord, Service, SessionRecord,
};
use hefl_utils::SharedRng;
use std::sync::Arc;
use tracing::{info, warn};

pub struct DefenderParams {
    pub fhe: FheConfig,
    /// Relative spread under which a decrypted vector is treated as one repeated sum
    pub flat_tolerance: f64,
    pub rng: SharedRng,
    pub defense: Arc<dyn PoisonDefense>,
    pub gateway: GatewayLink,
}

/// Key holding service.
///
/// The secret key only ever lives in `he`. It is regenerated with every new encryption context
/// and never written to the store.
pub struct Defender {
    he: Option<HeContext>,
    fhe: FheConfig,
    flat_tolerance: f64,
    rng: SharedRng,
    defense: Arc<dyn PoisonDefense>,
    gateway: GatewayLink,
    anomaly: Persistable<AnomalyRecord>,
    benign: Persistable<BenignSetRecord>,
    reward: Persistable<RewardRecord>,
}

impl Defender {
    /// Load persisted defender records from the store
    pub async fn load(params: DefenderParams, store: &DataStore) -> Result<Self> {
        let repositories = store.repositories();
        let anomaly = repositories
            .anomaly()
            .load_or_default(AnomalyRecord::default())
            .await?;
        let benign = repositories
            .benign()
            .load_or_default(BenignSetRecord::default())
            .await?;
        let reward = repositories
            .reward()
            .load_or_default(RewardRecord::default())
            .await?;

        Ok(Self {
            he: None,
            fhe: params.fhe,
            flat_tolerance: params.flat_tolerance,
            rng: params.rng,
            defense: params.defense,
            gateway: params.gateway,
            anomaly,
            benign,
            reward,
        })
    }

    /// Generate a fresh key set. Any previous secret key is dropped.
    pub fn init_encryption_context(&mut self) -> Result<EncryptionContext> {
        let he = HeContext::generate(self.fhe.preset, self.fhe.scale, self.rng.clone())?;
        let context = he.encryption_context()?;
        info!(
            "Initialized encryption context {} ({} slots)",
            context.id,
            context.slot_count()
        );
        self.he = Some(he);
        Ok(context)
    }

    /// Decrypt a batch, releasing only flat sums and multi contributor aggregates.
    ///
    /// All decryptions happen before any record is touched, so a failing batch changes nothing.
    pub fn guarded_decrypt(&mut self, request: &GuardedDecrypt) -> Result<Vec<Recovered>> {
        let he = self.he.as_ref().ok_or(DefenderError::NoContext)?;
        if request.context_id != he.id() {
            return Err(FheError::IncompatibleContext {
                left: request.context_id.clone(),
                right: he.id().to_string(),
            }
            .into());
        }

        let noise = match request.deltas.split_first() {
            None => None,
            Some((first, rest)) => {
                if request.deltas.len() != request.contributors {
                    return Err(DefenderError::DeltaCount {
                        expected: request.contributors,
                        actual: request.deltas.len(),
                    }
                    .into());
                }
                let mut sum = first.clone();
                for delta in rest {
                    sum = he.add(&sum, delta)?;
                }
                Some(he.decrypt_values(&sum)?)
            }
        };

        let releases = request
            .ciphers
            .iter()
            .map(|cipher| {
                let decrypted = he.decrypt_values(cipher)?;
                Ok(release(
                    &decrypted,
                    request.contributors,
                    noise.as_deref(),
                    self.flat_tolerance,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let slots = he.slot_count();
        let refused = releases.iter().any(|r| matches!(r, Release::Refused));
        let values = releases
            .into_iter()
            .map(|released| match released {
                Release::Flat(v) => Recovered::Scalar(v),
                Release::Aggregate(v) => Recovered::Vector(v),
                Release::Refused => Recovered::Vector(vec![0.0; slots]),
            })
            .collect();

        // One anomaly per refused request, however many chunks it spans
        if refused {
            self.record_anomaly(request.sessions.as_deref())?;
        }
        Ok(values)
    }

    fn record_anomaly(&mut self, sessions: Option<&[SessionRecord]>) -> Result<()> {
        let phi = self.anomaly.try_get()?.phi + 1;
        warn!(
            "Refused to release a single contributor's values, anomaly count is now {}",
            phi
        );
        match sessions.and_then(|s| s.last().map(|last| (s.len(), last))) {
            Some((count, current)) => {
                let rewards = calculate_rewards(count, phi, current);
                self.anomaly.set(AnomalyRecord { rc: rewards.rc, phi });
                self.reward.set(RewardRecord { rt: rewards.rt });
            }
            None => self.anomaly.try_mutate(|record| Ok(AnomalyRecord { phi, ..record }))?,
        }
        Ok(())
    }

    pub fn benign_model_ids(&self) -> Vec<String> {
        self.benign.get().map(|b| b.benign).unwrap_or_default()
    }

    /// Run the defense over the round's committed models and settle rewards
    pub fn settle_round(
        &mut self,
        models: &[CommittedModel],
        sessions: &[SessionRecord],
    ) -> Result<PoisonDefenseOutcome> {
        let current = sessions.last().ok_or(DefenderError::NoSession)?;
        let selected = self.defense.select_benign(models);
        let malicious = models
            .iter()
            .map(|m| m.entry.id.clone())
            .filter(|id| !selected.contains(id))
            .collect();
        let benign = BenignSetRecord {
            benign: selected,
            malicious,
        };

        let phi = self.anomaly.try_get()?.phi;
        let rewards = calculate_rewards(sessions.len(), phi, current);
        let rt = match benign.benign.len() {
            0 => 0.0,
            n => rewards.rt / n as f64,
        };

        let outcome = PoisonDefenseOutcome {
            anomaly: AnomalyRecord { rc: rewards.rc, phi },
            benign,
            reward: RewardRecord { rt },
        };
        info!(
            "Defense selected {} of {} models",
            outcome.benign.benign.len(),
            models.len()
        );

        self.benign.set(outcome.benign.clone());
        self.anomaly.set(outcome.anomaly);
        self.reward.set(outcome.reward);
        Ok(outcome)
    }

    pub fn anomaly(&self) -> AnomalyRecord {
        self.anomaly.get().unwrap_or_default()
    }

    pub fn reward(&self) -> RewardRecord {
        self.reward.get().unwrap_or_default()
    }

    fn handle_local(&mut self, msg: &Invoke) -> Result<String> {
        match msg.operation {
            Operation::InitEncryptionContext => {
                msg.decode::<InitEncryptionContext>()?;
                respond(&self.init_encryption_context()?)
            }
            Operation::GuardedDecrypt => {
                let request = msg.decode::<GuardedDecrypt>()?;
                let values = self.guarded_decrypt(&request)?;
                respond(&RecoveredValues { values })
            }
            Operation::GetBenignModelIds => {
                msg.decode::<GetBenignModelIds>()?;
                respond(&BenignIds {
                    ids: self.benign_model_ids(),
                })
            }
            other => bail!("{other} is not handled locally by the Defender"),
        }
    }

    fn apply_poison_defense(&mut self, msg: &Invoke) -> ResponseActFuture<Self, Result<String>> {
        if let Err(e) = msg.decode::<ApplyPoisonDefense>() {
            return Box::pin(fut::ready(Err(e.into())));
        }
        let gateway = self.gateway.clone();
        Box::pin(
            async move {
                let models = gateway.committed_local_models().await?;
                let sessions = gateway.training_sessions().await?;
                Ok::<_, anyhow::Error>((models, sessions))
            }
            .into_actor(self)
            .map(|res, act, _| {
                let (models, sessions) = res?;
                respond(&act.settle_round(&models, &sessions)?)
            }),
        )
    }
}

impl Actor for Defender {
    type Context = Context<Self>;
}

impl Handler<Invoke> for Defender {
    type Result = ResponseActFuture<Self, Result<String>>;

    fn handle(&mut self, msg: Invoke, _: &mut Self::Context) -> Self::Result {
        if let Err(e) = msg.authorize(Service::Defender) {
            warn!("Rejected invocation: {e}");
            return Box::pin(fut::ready(Err(e.into())));
        }
        match msg.operation {
            Operation::ApplyPoisonDefense => self.apply_poison_defense(&msg),
            _ => Box::pin(fut::ready(self.handle_local(&msg))),
        }
    }
}
