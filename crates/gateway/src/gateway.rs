// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    cosine_distance, encrypt_series, fit_to_widths, is_all_zero, recovered_sum,
    similarity_ciphers, sum_models, GatewayError, GatewayRepositoryFactory, StagedChunks,
};
use actix::prelude::*;
use anyhow::{bail, Result};
use hefl_data::{AutoPersist, DataStore, Persistable, RepositoriesFactory};
use hefl_fhe::{Cipher, EncryptionContext, HeContext};
use hefl_model::{chunk_values, flatten, ChunkSeries, FlatModel, LayerTemplates, ModelSource};
use hefl_protocol::{
    respond, AggregationOutcome, CommitLocalModel, CommittedModel, CommittedModels, DefenderLink,
    Empty, GetCommittedLocalModels, GetEncryptionContext, GetGlobalModel, GetTrainingSessions,
    GlobalModelRecord, GlobalModelView, GuardedDecrypt, InitSession, Invoke, LocalModelEntry,
    ModelStructure, Operation, PrivateAggregation, RoundCounter, Score, ScoreEntry, Service,
    SessionRecord, Sessions, StoreLocalModelChunk, StoredChunk,
};
use hefl_utils::{digest_json, SharedRng};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GatewayParams {
    pub rng: SharedRng,
    pub defender: DefenderLink,
    pub models: Arc<dyn ModelSource>,
    pub templates: LayerTemplates,
}

/// Session and round state machine.
///
/// Operations that call the Defender prepare everything they can synchronously, do all
/// encrypted work and cross service calls in one future, and only then mutate state. The
/// futures are atomic so no other invocation interleaves with a half finished one.
pub struct Gateway {
    he: Option<Arc<HeContext>>,
    rng: SharedRng,
    defender: DefenderLink,
    models: Arc<dyn ModelSource>,
    templates: LayerTemplates,
    sessions: Persistable<Vec<SessionRecord>>,
    context: Persistable<EncryptionContext>,
    global: Persistable<GlobalModelRecord>,
    global_chunks: Persistable<ChunkSeries<Cipher>>,
    local_models: Persistable<Vec<LocalModelEntry>>,
    scores: Persistable<Vec<ScoreEntry>>,
    staged: Persistable<StagedChunks>,
}

/// Everything a new session needs, computed before any state changes
struct NewSession {
    owner: String,
    request: InitSession,
    context: EncryptionContext,
    he: Arc<HeContext>,
    flat: FlatModel,
    plain: Vec<Vec<f64>>,
    chunks: ChunkSeries<Cipher>,
}

/// Snapshot of the state an aggregation works on
struct AggregationJob {
    he: Arc<HeContext>,
    sessions: Vec<SessionRecord>,
    next: SessionRecord,
    entries: Vec<LocalModelEntry>,
    staged: StagedChunks,
    widths: Vec<usize>,
    structure: ModelStructure,
    chunk_limit: usize,
}

struct RoundResult {
    next: SessionRecord,
    published: Option<(GlobalModelRecord, ChunkSeries<Cipher>)>,
}

impl Gateway {
    pub async fn load(params: GatewayParams, store: &DataStore) -> Result<Self> {
        let repositories = store.repositories();
        let sessions = repositories.sessions().load_or_default(vec![]).await?;
        let context = repositories.encryption_context().load().await?;
        let global = repositories.global_model().load().await?;
        let global_chunks = repositories.global_chunks().load().await?;
        let local_models = repositories.local_models().load_or_default(vec![]).await?;
        let scores = repositories.scores().load_or_default(vec![]).await?;
        let staged = repositories
            .staged_chunks()
            .load_or_default(StagedChunks::new())
            .await?;

        let he = match context.get() {
            Some(ctx) => Some(Arc::new(HeContext::from_context(&ctx, params.rng.clone())?)),
            None => None,
        };

        Ok(Self {
            he,
            rng: params.rng,
            defender: params.defender,
            models: params.models,
            templates: params.templates,
            sessions,
            context,
            global,
            global_chunks,
            local_models,
            scores,
            staged,
        })
    }

    pub fn encryption_context(&self) -> Result<EncryptionContext> {
        Ok(self.context.get().ok_or(GatewayError::NoSession)?)
    }

    pub fn training_sessions(&self) -> Vec<SessionRecord> {
        self.sessions.get().unwrap_or_default()
    }

    pub fn global_model(&self) -> Result<GlobalModelView> {
        let global = self.global.get().ok_or(GatewayError::NoSession)?;
        Ok(GlobalModelView {
            id: global.id,
            model: global.plain,
            structure: global.structure,
        })
    }

    /// Registry entries of the current round joined with their scores
    pub fn committed_local_models(&self) -> Vec<CommittedModel> {
        let scores = self.scores.get().unwrap_or_default();
        self.local_models
            .get()
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                let score = scores
                    .iter()
                    .find(|s| s.id == entry.id)
                    .map(|s| s.score)
                    .unwrap_or_default();
                CommittedModel { entry, score }
            })
            .collect()
    }

    /// Stage one transaction's worth of a local model's chunks for the current round. Rewriting a
    /// part is harmless.
    pub fn store_local_model_chunk(&mut self, request: StoreLocalModelChunk) -> Result<StoredChunk> {
        if self.context.get().is_none() {
            return Err(GatewayError::NoSession.into());
        }
        let StoreLocalModelChunk { id, chunk, series } = request;
        self.staged.try_mutate(|mut staged| {
            staged
                .entry(id.clone())
                .or_insert_with(|| ChunkSeries::new(series.total()))
                .insert(series, chunk)?;
            Ok(staged)
        })?;
        debug!("Stored part {} of model {}", series, id);
        Ok(StoredChunk {
            id,
            completed: series,
        })
    }

    fn cached_score(&self, id: &str) -> Option<f64> {
        let committed = self
            .local_models
            .get()
            .unwrap_or_default()
            .iter()
            .any(|entry| entry.id == id);
        if !committed {
            return None;
        }
        Some(
            self.scores
                .get()
                .unwrap_or_default()
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.score)
                .unwrap_or_default(),
        )
    }

    fn prepare_session(&self, msg: &Invoke) -> Result<(InitSession, FlatModel)> {
        let request = msg.decode::<InitSession>()?;
        let template = self.templates.get(&request.model_type)?;
        let tensors = self.models.load(&request.model_name)?;
        let flat = flatten(&tensors, template)?;
        Ok((request, flat))
    }

    fn init_session(&mut self, msg: &Invoke) -> AtomicResponse<Self, Result<String>> {
        let (request, flat) = match self.prepare_session(msg) {
            Ok(prepared) => prepared,
            Err(e) => return ready(Err(e)),
        };
        let owner = msg.caller.digest();
        let defender = self.defender.clone();
        let rng = self.rng.clone();

        AtomicResponse::new(Box::pin(
            open_session(defender, rng, owner, request, flat)
                .into_actor(self)
                .map(|res, act, _| {
                    act.start_session(res?)?;
                    respond(&Empty {})
                }),
        ))
    }

    fn start_session(&mut self, session: NewSession) -> Result<()> {
        let NewSession {
            owner,
            request,
            context,
            he,
            flat,
            plain,
            chunks,
        } = session;

        let global = GlobalModelRecord {
            id: digest_json(&plain)?,
            plain,
            structure: ModelStructure {
                model_type: request.model_type.clone(),
                layers: flat.layers,
                shapes: flat.shapes,
            },
            series_length: chunks.total(),
        };
        let record = SessionRecord {
            owner,
            context_id: context.id.clone(),
            rounds: RoundCounter::new(request.rounds),
            reward: request.reward,
            model_name: request.model_name,
            model_type: request.model_type,
        };

        self.sessions.try_mutate(|mut sessions| {
            sessions.push(record);
            Ok(sessions)
        })?;
        info!(
            "Started session with {} rounds on context {} with global model {}",
            request.rounds, context.id, global.id
        );
        self.context.set(context);
        self.he = Some(he);
        self.global_chunks.set(chunks);
        self.global.set(global);
        self.local_models.set(vec![]);
        self.scores.set(vec![]);
        self.staged.set(StagedChunks::new());
        Ok(())
    }

    fn prepare_scoring(
        &self,
        request: &CommitLocalModel,
    ) -> Result<(Arc<HeContext>, Vec<Cipher>, Vec<Cipher>, usize)> {
        let he = self.he.clone().ok_or(GatewayError::NoSession)?;
        let series = self
            .staged
            .try_with(|staged| Ok(staged.get(&request.id).cloned()))?
            .ok_or_else(|| GatewayError::UnknownSeries(request.id.clone()))?;
        if series.total() != request.series_length {
            return Err(GatewayError::SeriesLength {
                id: request.id.clone(),
                stored: series.total(),
                committed: request.series_length,
            }
            .into());
        }
        let local = series.assemble()?;
        let global = self
            .global_chunks
            .get()
            .ok_or(GatewayError::NoSession)?
            .assemble()?;
        let contributors = self.local_models.get().map(|m| m.len()).unwrap_or_default();
        Ok((he, local, global, contributors))
    }

    fn commit_local_model(&mut self, msg: &Invoke) -> AtomicResponse<Self, Result<String>> {
        let request = match msg.decode::<CommitLocalModel>() {
            Ok(request) => request,
            Err(e) => return ready(Err(e.into())),
        };
        if let Some(score) = self.cached_score(&request.id) {
            warn!("Model {} was already committed this round", request.id);
            return ready(respond(&Score { score }));
        }
        let (he, local, global, contributors) = match self.prepare_scoring(&request) {
            Ok(prepared) => prepared,
            Err(e) => return ready(Err(e)),
        };
        let client = msg.caller.digest();
        let defender = self.defender.clone();

        AtomicResponse::new(Box::pin(
            score_model(defender, he, local, global, request.delta.clone(), contributors)
                .into_actor(self)
                .map(move |res, act, _| {
                    let score = act.register(client, request, res?)?;
                    respond(&Score { score })
                }),
        ))
    }

    fn register(&mut self, client: String, request: CommitLocalModel, score: f64) -> Result<f64> {
        if let Some(cached) = self.cached_score(&request.id) {
            return Ok(cached);
        }
        let CommitLocalModel {
            id,
            delta,
            series_length,
        } = request;
        self.scores.try_mutate(|mut scores| {
            scores.push(ScoreEntry {
                id: id.clone(),
                score,
            });
            Ok(scores)
        })?;
        self.local_models.try_mutate(|mut models| {
            models.push(LocalModelEntry {
                client,
                id: id.clone(),
                delta,
                series_length,
            });
            Ok(models)
        })?;
        info!("Committed model {} with score {:.4}", id, score);
        Ok(score)
    }

    /// `None` when the session has no rounds left
    fn prepare_aggregation(&self, chunk_limit: usize) -> Result<Option<AggregationJob>> {
        let sessions = self.training_sessions();
        let current = sessions.last().ok_or(GatewayError::NoSession)?;
        let Some(rounds) = current.rounds.advance() else {
            return Ok(None);
        };
        let next = SessionRecord {
            rounds,
            ..current.clone()
        };
        let global = self.global.get().ok_or(GatewayError::NoSession)?;
        Ok(Some(AggregationJob {
            he: self.he.clone().ok_or(GatewayError::NoSession)?,
            next,
            sessions,
            entries: self.local_models.get().unwrap_or_default(),
            staged: self.staged.get().unwrap_or_default(),
            widths: global.plain.iter().map(Vec::len).collect(),
            structure: global.structure,
            chunk_limit,
        }))
    }

    fn private_aggregation(&mut self, msg: &Invoke) -> AtomicResponse<Self, Result<String>> {
        let job = match msg
            .decode::<PrivateAggregation>()
            .map_err(anyhow::Error::from)
            .and_then(|request| self.prepare_aggregation(request.chunk_limit))
        {
            Ok(Some(job)) => job,
            Ok(None) => {
                info!("Session is complete, nothing to aggregate");
                return ready(respond(&AggregationOutcome::default()));
            }
            Err(e) => return ready(Err(e)),
        };
        let defender = self.defender.clone();

        AtomicResponse::new(Box::pin(compute_round(defender, job).into_actor(self).map(
            |res, act, _| {
                let Some(result) = res? else {
                    warn!("No benign models were committed, the round does not advance");
                    return respond(&AggregationOutcome::default());
                };
                respond(&act.finish_round(result)?)
            },
        )))
    }

    fn finish_round(&mut self, result: RoundResult) -> Result<AggregationOutcome> {
        let RoundResult { next, published } = result;
        let rounds = next.rounds;

        self.sessions.try_mutate(|mut sessions| {
            sessions.push(next);
            Ok(sessions)
        })?;

        // Uploads belong to the round they were made in
        self.staged.set(StagedChunks::new());
        self.local_models.set(vec![]);
        self.scores.set(vec![]);

        let published = match published {
            Some((record, chunks)) => {
                let id = record.id.clone();
                self.global_chunks.set(chunks);
                self.global.set(record);
                info!("Round advanced to {}, published global model {}", rounds, id);
                Some(id)
            }
            None => {
                warn!(
                    "Round advanced to {} but the aggregate was withheld, keeping the global model",
                    rounds
                );
                None
            }
        };

        Ok(AggregationOutcome {
            rounds: Some(rounds),
            published,
        })
    }

    fn handle_local(&mut self, msg: &Invoke) -> Result<String> {
        match msg.operation {
            Operation::GetEncryptionContext => {
                msg.decode::<GetEncryptionContext>()?;
                respond(&self.encryption_context()?)
            }
            Operation::GetTrainingSessions => {
                msg.decode::<GetTrainingSessions>()?;
                respond(&Sessions {
                    sessions: self.training_sessions(),
                })
            }
            Operation::StoreLocalModelChunk => {
                let request = msg.decode::<StoreLocalModelChunk>()?;
                respond(&self.store_local_model_chunk(request)?)
            }
            Operation::GetGlobalModel => {
                msg.decode::<GetGlobalModel>()?;
                respond(&self.global_model()?)
            }
            Operation::GetCommittedLocalModels => {
                msg.decode::<GetCommittedLocalModels>()?;
                respond(&CommittedModels {
                    models: self.committed_local_models(),
                })
            }
            other => bail!("{other} is not handled locally by the Gateway"),
        }
    }
}

async fn open_session(
    defender: DefenderLink,
    rng: SharedRng,
    owner: String,
    request: InitSession,
    flat: FlatModel,
) -> Result<NewSession> {
    let context = defender.init_encryption_context().await?;
    let he = Arc::new(HeContext::from_context(&context, rng)?);
    let plain = chunk_values(&flat.values, he.slot_count());
    let chunks = encrypt_series(&he, &plain, request.chunk_limit)?;
    Ok(NewSession {
        owner,
        request,
        context,
        he,
        flat,
        plain,
        chunks,
    })
}

/// Encrypted cosine distance between the global model and `local`, decrypted through the
/// Defender one quantity at a time
async fn score_model(
    defender: DefenderLink,
    he: Arc<HeContext>,
    local: Vec<Cipher>,
    global: Vec<Cipher>,
    delta: Cipher,
    contributors: usize,
) -> Result<f64> {
    let parts = similarity_ciphers(&he, &local, &global, &delta)?;
    let mut sums = vec![];
    for ciphers in [parts.global_norms, parts.local_norms, parts.dots] {
        let released = defender
            .guarded_decrypt(&GuardedDecrypt {
                ciphers,
                context_id: he.id().to_string(),
                contributors,
                deltas: vec![],
                sessions: None,
            })
            .await?;
        sums.push(recovered_sum(&released));
    }
    Ok(cosine_distance(sums[0], sums[1], sums[2]))
}

/// `None` when no committed model is benign
async fn compute_round(defender: DefenderLink, job: AggregationJob) -> Result<Option<RoundResult>> {
    let ids = defender.benign_model_ids().await?;
    let benign: Vec<LocalModelEntry> = job
        .entries
        .into_iter()
        .filter(|entry| ids.contains(&entry.id))
        .collect();
    if benign.is_empty() {
        return Ok(None);
    }

    let mut models = vec![];
    for entry in &benign {
        let series = job
            .staged
            .get(&entry.id)
            .ok_or_else(|| GatewayError::UnknownSeries(entry.id.clone()))?;
        models.push(series.assemble()?);
    }
    let summed = sum_models(&job.he, &models)?;
    if summed.len() != job.widths.len() {
        return Err(GatewayError::IncompatibleShape {
            global: job.widths.len(),
            local: summed.len(),
        }
        .into());
    }

    let released = defender
        .guarded_decrypt(&GuardedDecrypt {
            ciphers: summed,
            context_id: job.he.id().to_string(),
            contributors: benign.len(),
            deltas: benign.iter().map(|entry| entry.delta.clone()).collect(),
            sessions: Some(job.sessions),
        })
        .await?;
    let plain = fit_to_widths(released, &job.widths);

    let published = if is_all_zero(&plain) {
        None
    } else {
        let chunks = encrypt_series(&job.he, &plain, job.chunk_limit)?;
        let record = GlobalModelRecord {
            id: digest_json(&plain)?,
            plain,
            structure: job.structure,
            series_length: chunks.total(),
        };
        Some((record, chunks))
    };
    Ok(Some(RoundResult {
        next: job.next,
        published,
    }))
}

fn ready(res: Result<String>) -> AtomicResponse<Gateway, Result<String>> {
    AtomicResponse::new(Box::pin(fut::ready(res)))
}

impl Actor for Gateway {
    type Context = Context<Self>;
}

impl Handler<Invoke> for Gateway {
    type Result = AtomicResponse<Self, Result<String>>;

    fn handle(&mut self, msg: Invoke, _: &mut Self::Context) -> Self::Result {
        if let Err(e) = msg.authorize(Service::Gateway) {
            warn!("Rejected invocation: {e}");
            return ready(Err(e.into()));
        }
        match msg.operation {
            Operation::InitSession => self.init_session(&msg),
            Operation::CommitLocalModel => self.commit_local_model(&msg),
            Operation::PrivateAggregation => self.private_aggregation(&msg),
            _ => ready(self.handle_local(&msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hefl_defender::{AcceptAll, Defender, DefenderParams};
    use hefl_model::{plan_series, SeriesMarker};
    use hefl_protocol::{Caller, GatewayLink};
    use hefl_test_helpers::{
        in_mem_store, init_test_tracing, sample_models, test_fhe_config, test_templates,
        tiny_model, wide_model, TINY, WIDE,
    };
    use hefl_utils::create_shared_rng_from_u64;

    struct Federation {
        gateway: Addr<Gateway>,
        defender: Addr<Defender>,
    }

    impl Federation {
        fn client(&self, name: &str) -> GatewayLink {
            GatewayLink::new(self.gateway.clone().recipient(), Caller::client(name))
        }

        fn defender(&self) -> DefenderLink {
            DefenderLink::new(
                self.defender.clone().recipient(),
                Caller::client("orchestrator"),
            )
        }
    }

    async fn federation() -> Result<Federation> {
        init_test_tracing();
        let (store, _) = in_mem_store();
        let ctx = Context::<Gateway>::new();
        let defender = Defender::load(
            DefenderParams {
                fhe: test_fhe_config(),
                flat_tolerance: 0.05,
                rng: create_shared_rng_from_u64(1),
                defense: Arc::new(AcceptAll),
                gateway: GatewayLink::new(
                    ctx.address().recipient(),
                    Caller::Service(Service::Defender),
                ),
            },
            &store,
        )
        .await?
        .start();
        let gateway = Gateway::load(
            GatewayParams {
                rng: create_shared_rng_from_u64(2),
                defender: DefenderLink::new(
                    defender.clone().recipient(),
                    Caller::Service(Service::Gateway),
                ),
                models: Arc::new(sample_models()),
                templates: LayerTemplates::with_extra(&test_templates()),
            },
            &store,
        )
        .await?;
        Ok(Federation {
            gateway: ctx.run(gateway),
            defender,
        })
    }

    fn init(rounds: usize) -> InitSession {
        InitSession {
            model_name: "tiny".to_string(),
            model_type: TINY.to_string(),
            rounds,
            reward: 100.0,
            chunk_limit: 1,
        }
    }

    fn wide_init(rounds: usize) -> InitSession {
        InitSession {
            model_name: "wide".to_string(),
            model_type: WIDE.to_string(),
            ..init(rounds)
        }
    }

    fn tiny_values(seed: u64) -> Result<Vec<f64>> {
        let template = test_templates().remove(TINY).unwrap_or_default();
        Ok(flatten(&tiny_model(seed), &template)?.values)
    }

    fn wide_values(seed: u64) -> Result<Vec<f64>> {
        let template = test_templates().remove(WIDE).unwrap_or_default();
        Ok(flatten(&wide_model(seed), &template)?.values)
    }

    /// Upload `values` masked by `offset` in every slot and commit them
    async fn submit(link: &GatewayLink, values: &[f64], offset: f64) -> Result<(String, f64)> {
        let context = link.encryption_context().await?;
        let he = HeContext::from_context(&context, create_shared_rng_from_u64(3))?;
        let slots = he.slot_count();
        let ciphers = chunk_values(values, slots)
            .into_iter()
            .map(|mut chunk| {
                chunk.resize(slots, 0.0);
                chunk.iter_mut().for_each(|v| *v += offset);
                he.encrypt_values(&chunk)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let delta = he.encrypt_values(&vec![offset; slots])?;
        let id = digest_json(&ciphers)?;
        let plan = plan_series(&ciphers, 1);
        let series_length = plan.len();
        for (series, chunk) in plan {
            link.store_local_model_chunk(&StoreLocalModelChunk {
                id: id.clone(),
                chunk,
                series,
            })
            .await?;
        }
        let score = link
            .commit_local_model(&CommitLocalModel {
                id: id.clone(),
                delta,
                series_length,
            })
            .await?;
        Ok((id, score))
    }

    #[actix::test]
    async fn queries_fail_before_a_session() -> Result<()> {
        let federation = federation().await?;
        let client = federation.client("alice");
        let err = match client.global_model().await {
            Ok(_) => bail!("there is no global model yet"),
            Err(err) => err,
        };
        assert_eq!(
            err.downcast_ref::<GatewayError>(),
            Some(&GatewayError::NoSession)
        );
        assert!(client.training_sessions().await?.is_empty());
        Ok(())
    }

    #[actix::test]
    async fn session_publishes_the_initial_model() -> Result<()> {
        let federation = federation().await?;
        let owner = federation.client("owner");
        owner.init_session(&init(3)).await?;

        let sessions = owner.training_sessions().await?;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].rounds.to_string(), "3/3");
        assert_eq!(sessions[0].owner, Caller::client("owner").digest());

        let context = owner.encryption_context().await?;
        assert_eq!(sessions[0].context_id, context.id);

        let global = owner.global_model().await?;
        assert_eq!(global.model, vec![tiny_values(0)?]);
        assert_eq!(global.structure.layers, vec!["fc.weight", "fc.bias"]);
        assert_eq!(global.structure.shapes, vec![vec![2, 3], vec![2]]);
        Ok(())
    }

    #[actix::test]
    async fn unknown_model_type_is_rejected() -> Result<()> {
        let federation = federation().await?;
        let request = InitSession {
            model_type: "Nope".to_string(),
            ..init(1)
        };
        assert!(federation.client("owner").init_session(&request).await.is_err());
        assert!(federation
            .client("owner")
            .training_sessions()
            .await?
            .is_empty());
        Ok(())
    }

    #[actix::test]
    async fn commit_is_idempotent() -> Result<()> {
        let federation = federation().await?;
        let alice = federation.client("alice");
        alice.init_session(&init(2)).await?;

        let (id, score) = submit(&alice, &tiny_values(0)?, 0.5).await?;
        assert!(score.is_finite());
        // identical direction to the global model
        assert!(score.abs() < 1e-2, "score was {score}");

        let committed = alice.committed_local_models().await?;
        let again = alice
            .commit_local_model(&CommitLocalModel {
                id: id.clone(),
                delta: committed[0].entry.delta.clone(),
                series_length: 1,
            })
            .await?;
        assert_eq!(again, score);

        let committed = alice.committed_local_models().await?;
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].entry.id, id);
        assert_eq!(committed[0].entry.client, Caller::client("alice").digest());
        Ok(())
    }

    #[actix::test]
    async fn commit_needs_stored_chunks() -> Result<()> {
        let federation = federation().await?;
        let alice = federation.client("alice");
        alice.init_session(&init(2)).await?;
        let context = alice.encryption_context().await?;
        let he = HeContext::from_context(&context, create_shared_rng_from_u64(4))?;

        let err = match alice
            .commit_local_model(&CommitLocalModel {
                id: "missing".to_string(),
                delta: he.encrypt_values(&[0.0])?,
                series_length: 1,
            })
            .await
        {
            Ok(_) => bail!("nothing was stored under this id"),
            Err(err) => err,
        };
        assert_eq!(
            err.downcast_ref::<GatewayError>(),
            Some(&GatewayError::UnknownSeries("missing".to_string()))
        );
        assert!(alice.committed_local_models().await?.is_empty());
        Ok(())
    }

    #[actix::test]
    async fn round_publishes_the_mean_of_benign_models() -> Result<()> {
        let federation = federation().await?;
        let owner = federation.client("owner");
        owner.init_session(&init(2)).await?;
        let before = owner.global_model().await?;

        let locals = [tiny_values(1)?, tiny_values(2)?, tiny_values(3)?];
        for (i, values) in locals.iter().enumerate() {
            let client = federation.client(&format!("client-{i}"));
            submit(&client, values, 0.25 * (i + 1) as f64).await?;
        }

        let outcome = federation.defender().apply_poison_defense().await?;
        assert_eq!(outcome.benign.benign.len(), 3);

        let outcome = owner.private_aggregation(1).await?;
        assert_eq!(outcome.rounds.map(|r| r.remaining()), Some(1));
        let published = outcome
            .published
            .ok_or_else(|| anyhow::anyhow!("aggregate should have been published"))?;

        let after = owner.global_model().await?;
        assert_eq!(after.id, published);
        assert_ne!(after.id, before.id);
        assert_eq!(after.structure, before.structure);
        for (i, value) in after.model[0].iter().enumerate() {
            let mean = locals.iter().map(|l| l[i]).sum::<f64>() / 3.0;
            assert!((value - mean).abs() < 1e-2, "{value} != {mean}");
        }

        assert_eq!(owner.training_sessions().await?.len(), 2);
        assert!(owner.committed_local_models().await?.is_empty());
        Ok(())
    }

    #[actix::test]
    async fn single_benign_model_is_withheld() -> Result<()> {
        let federation = federation().await?;
        let owner = federation.client("owner");
        owner.init_session(&init(3)).await?;
        let before = owner.global_model().await?;

        submit(&federation.client("alice"), &tiny_values(5)?, 0.5).await?;
        federation.defender().apply_poison_defense().await?;

        let outcome = owner.private_aggregation(1).await?;
        assert_eq!(outcome.rounds.map(|r| r.remaining()), Some(2));
        assert_eq!(outcome.published, None);
        assert_eq!(owner.global_model().await?.id, before.id);

        let settled = federation.defender().apply_poison_defense().await?;
        assert_eq!(settled.anomaly.phi, 1);
        Ok(())
    }

    #[actix::test]
    async fn round_without_benign_models_is_a_no_op() -> Result<()> {
        let federation = federation().await?;
        let owner = federation.client("owner");
        owner.init_session(&init(2)).await?;

        let outcome = owner.private_aggregation(1).await?;
        assert_eq!(outcome, AggregationOutcome::default());
        assert_eq!(owner.training_sessions().await?.len(), 1);
        Ok(())
    }

    #[actix::test]
    async fn completed_session_is_not_aggregated() -> Result<()> {
        let federation = federation().await?;
        let owner = federation.client("owner");
        owner.init_session(&init(1)).await?;
        for (i, seed) in [7, 8].into_iter().enumerate() {
            submit(&federation.client(&format!("c{i}")), &tiny_values(seed)?, 0.5).await?;
        }
        federation.defender().apply_poison_defense().await?;

        let outcome = owner.private_aggregation(1).await?;
        assert_eq!(outcome.rounds.map(|r| r.is_complete()), Some(true));

        let outcome = owner.private_aggregation(1).await?;
        assert_eq!(outcome, AggregationOutcome::default());
        assert_eq!(owner.training_sessions().await?.len(), 2);
        Ok(())
    }

    #[actix::test]
    async fn uploads_need_a_session() -> Result<()> {
        let federation = federation().await?;
        let err = match federation
            .client("alice")
            .store_local_model_chunk(&StoreLocalModelChunk {
                id: "early".to_string(),
                chunk: vec![],
                series: SeriesMarker::new(1, 1)?,
            })
            .await
        {
            Ok(_) => bail!("uploads are only accepted during a session"),
            Err(err) => err,
        };
        assert_eq!(
            err.downcast_ref::<GatewayError>(),
            Some(&GatewayError::NoSession)
        );
        Ok(())
    }

    #[actix::test]
    async fn round_drops_uncommitted_uploads() -> Result<()> {
        let federation = federation().await?;
        let owner = federation.client("owner");
        owner.init_session(&init(2)).await?;
        for (i, seed) in [1, 2].into_iter().enumerate() {
            submit(&federation.client(&format!("c{i}")), &tiny_values(seed)?, 0.5).await?;
        }

        // Uploaded but never committed
        let idle = federation.client("idle");
        let context = idle.encryption_context().await?;
        let he = HeContext::from_context(&context, create_shared_rng_from_u64(5))?;
        let delta = he.encrypt_values(&[0.5])?;
        idle.store_local_model_chunk(&StoreLocalModelChunk {
            id: "abandoned".to_string(),
            chunk: vec![he.encrypt_values(&tiny_values(3)?)?],
            series: SeriesMarker::new(1, 1)?,
        })
        .await?;

        federation.defender().apply_poison_defense().await?;
        owner.private_aggregation(1).await?;

        let err = match idle
            .commit_local_model(&CommitLocalModel {
                id: "abandoned".to_string(),
                delta,
                series_length: 1,
            })
            .await
        {
            Ok(_) => bail!("uploads of a finished round are gone"),
            Err(err) => err,
        };
        assert_eq!(
            err.downcast_ref::<GatewayError>(),
            Some(&GatewayError::UnknownSeries("abandoned".to_string()))
        );
        Ok(())
    }

    #[actix::test]
    async fn multi_chunk_round_publishes_the_mean() -> Result<()> {
        let federation = federation().await?;
        let owner = federation.client("owner");
        owner.init_session(&wide_init(2)).await?;
        let before = owner.global_model().await?;
        assert_eq!(
            before.model.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![1024, 206]
        );

        let locals = [wide_values(1)?, wide_values(2)?, wide_values(3)?];
        for (i, values) in locals.iter().enumerate() {
            let client = federation.client(&format!("client-{i}"));
            let (_, score) = submit(&client, values, 0.1 * (i + 1) as f64).await?;
            assert!(score.is_finite());
        }
        federation.defender().apply_poison_defense().await?;

        let outcome = owner.private_aggregation(1).await?;
        assert!(outcome.published.is_some());

        let after = owner.global_model().await?;
        assert_eq!(
            after.model.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![1024, 206]
        );
        assert_eq!(after.structure, before.structure);
        let published: Vec<f64> = after.model.into_iter().flatten().collect();
        for (i, value) in published.iter().enumerate() {
            let mean = locals.iter().map(|l| l[i]).sum::<f64>() / 3.0;
            assert!((value - mean).abs() < 1e-2, "slot {i}: {value} != {mean}");
        }
        Ok(())
    }

    #[actix::test]
    async fn multi_chunk_refusal_is_one_anomaly() -> Result<()> {
        let federation = federation().await?;
        let owner = federation.client("owner");
        owner.init_session(&wide_init(2)).await?;

        submit(&federation.client("alice"), &wide_values(4)?, 0.2).await?;
        federation.defender().apply_poison_defense().await?;

        let outcome = owner.private_aggregation(1).await?;
        assert_eq!(outcome.published, None);

        let settled = federation.defender().apply_poison_defense().await?;
        assert_eq!(settled.anomaly.phi, 1);
        // 100 * 0.1 * exp(-1 / 2 sessions)
        assert!((settled.anomaly.rc - 10.0 * (-0.5f64).exp()).abs() < 1e-9);
        Ok(())
    }
}
