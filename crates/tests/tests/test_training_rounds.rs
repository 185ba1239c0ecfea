// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{anyhow, Result};
use hefl_builder::{telemetry, Federation, FederationBuilder};
use hefl_config::AppConfig;
use hefl_model::{flatten, TensorCollection};
use hefl_protocol::{AggregationOutcome, Caller, CommitLocalModel, InitSession};
use hefl_test_helpers::{
    sample_models, test_fhe_config, test_templates, tiny_model, wide_model, TINY, WIDE,
};
use hefl_utils::create_shared_rng_from_u64;
use std::sync::Arc;
use tracing::Level;

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.fhe = test_fhe_config();
    config.models.templates = test_templates();
    config.data.in_mem = true;
    config.gateway.max_chunks_per_tx = 1;
    config
}

async fn federation(seed: u64) -> Result<Federation> {
    telemetry::try_setup_env_tracing(Level::WARN);
    FederationBuilder::new(config(), create_shared_rng_from_u64(seed))
        .with_models(Arc::new(sample_models()))
        .build()
        .await
}

fn values_of(model: &TensorCollection, model_type: &str) -> Result<Vec<f64>> {
    let template = test_templates().remove(model_type).unwrap_or_default();
    Ok(flatten(model, &template)?.values)
}

fn values(model: &TensorCollection) -> Result<Vec<f64>> {
    values_of(model, TINY)
}

fn mean_of(models: &[Vec<f64>]) -> Vec<f64> {
    (0..models[0].len())
        .map(|i| models.iter().map(|v| v[i]).sum::<f64>() / models.len() as f64)
        .collect()
}

fn close(left: &[f64], right: &[f64], tolerance: f64) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(l, r)| (l - r).abs() < tolerance)
}

/// Two rounds with a reward of 100: a full round, a withheld round, then nothing
#[actix::test]
async fn test_training_rounds() -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let subscriber = fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_test_writer()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    ///////////////////////////////////////////////////////////////////////////////////
    // 1. Start a federation and open a session
    ///////////////////////////////////////////////////////////////////////////////////
    let federation = federation(42).await?;
    let owner = federation.gateway_link(Caller::client("owner"));
    let orchestrator = federation.defender_link(Caller::client("orchestrator"));

    owner
        .init_session(&InitSession {
            model_name: "tiny".to_string(),
            model_type: TINY.to_string(),
            rounds: 2,
            reward: 100.0,
            chunk_limit: federation.max_chunks_per_tx(),
        })
        .await?;
    let initial = owner.global_model().await?;
    let sessions = owner.training_sessions().await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].rounds.to_string(), "2/2");

    ///////////////////////////////////////////////////////////////////////////////////
    // 2. Three participants train and submit distinct models
    ///////////////////////////////////////////////////////////////////////////////////
    let locals = [tiny_model(1), tiny_model(2), tiny_model(3)];
    let mut receipts = vec![];
    for (i, local) in locals.iter().enumerate() {
        let client = federation.client(&format!("participant-{i}"));
        receipts.push(client.submit(local).await?);
    }
    assert_eq!(
        receipts
            .iter()
            .map(|r| r.id.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len(),
        3
    );
    assert!(receipts.iter().all(|r| r.score.is_finite()));
    assert_eq!(owner.committed_local_models().await?.len(), 3);

    ///////////////////////////////////////////////////////////////////////////////////
    // 3. Defense accepts all three and settles rewards
    ///////////////////////////////////////////////////////////////////////////////////
    let settled = orchestrator.apply_poison_defense().await?;
    assert_eq!(settled.benign.benign.len(), 3);
    assert!(settled.benign.malicious.is_empty());
    assert_eq!(settled.anomaly.phi, 0);
    // 100 * 0.1 * exp(-0 / 1)
    assert!((settled.anomaly.rc - 10.0).abs() < 1e-9);
    // (100 - 10) / 2 rounds, shared by 3 benign models
    assert!((settled.reward.rt - 15.0).abs() < 1e-9);

    ///////////////////////////////////////////////////////////////////////////////////
    // 4. Aggregate: the mean of the three models becomes the global model
    ///////////////////////////////////////////////////////////////////////////////////
    let outcome = owner
        .private_aggregation(federation.max_chunks_per_tx())
        .await?;
    assert_eq!(outcome.rounds.map(|r| r.to_string()), Some("1/2".to_string()));
    let published = outcome
        .published
        .ok_or_else(|| anyhow!("round one must publish"))?;
    assert_ne!(published, initial.id);

    let local_values = locals.iter().map(values).collect::<Result<Vec<_>>>()?;
    let mean = mean_of(&local_values);
    let global = federation.client("participant-0").global_model().await?;
    assert!(close(&values(&global)?, &mean, 1e-2));
    assert!(owner.committed_local_models().await?.is_empty());

    ///////////////////////////////////////////////////////////////////////////////////
    // 5. A lone submission is withheld: round advances, global model stays
    ///////////////////////////////////////////////////////////////////////////////////
    federation.client("participant-1").submit(&tiny_model(4)).await?;
    orchestrator.apply_poison_defense().await?;
    let outcome = owner
        .private_aggregation(federation.max_chunks_per_tx())
        .await?;
    assert_eq!(outcome.rounds.map(|r| r.to_string()), Some("0/2".to_string()));
    assert_eq!(outcome.published, None);
    assert_eq!(owner.global_model().await?.id, published);

    let settled = orchestrator.apply_poison_defense().await?;
    assert_eq!(settled.anomaly.phi, 1);

    ///////////////////////////////////////////////////////////////////////////////////
    // 6. The session is complete, aggregation no longer does anything
    ///////////////////////////////////////////////////////////////////////////////////
    let outcome = owner
        .private_aggregation(federation.max_chunks_per_tx())
        .await?;
    assert_eq!(outcome, AggregationOutcome::default());
    assert_eq!(owner.training_sessions().await?.len(), 3);
    assert_eq!(owner.global_model().await?.id, published);

    Ok(())
}

#[actix::test]
async fn test_commit_is_idempotent() -> Result<()> {
    let federation = federation(7).await?;
    let owner = federation.gateway_link(Caller::client("owner"));
    owner
        .init_session(&InitSession {
            model_name: "tiny".to_string(),
            model_type: TINY.to_string(),
            rounds: 1,
            reward: 10.0,
            chunk_limit: 1,
        })
        .await?;

    let alice = federation.client("alice");
    let receipt = alice.submit(&tiny_model(11)).await?;
    let committed = owner.committed_local_models().await?;
    assert_eq!(committed.len(), 1);

    // a retried commit of the same id returns the first score
    let score = federation
        .gateway_link(Caller::client("alice"))
        .commit_local_model(&CommitLocalModel {
            id: receipt.id.clone(),
            delta: committed[0].entry.delta.clone(),
            series_length: receipt.series_length,
        })
        .await?;
    assert_eq!(score, receipt.score);
    assert_eq!(owner.committed_local_models().await?.len(), 1);
    Ok(())
}

#[actix::test]
async fn test_global_model_keeps_its_shape() -> Result<()> {
    let federation = federation(9).await?;
    federation
        .gateway_link(Caller::client("owner"))
        .init_session(&InitSession {
            model_name: "tiny".to_string(),
            model_type: TINY.to_string(),
            rounds: 1,
            reward: 10.0,
            chunk_limit: 1,
        })
        .await?;

    let global = federation.client("bob").global_model().await?;
    assert_eq!(global, tiny_model(0));
    Ok(())
}

/// A model spanning two plaintexts, uploaded one chunk per transaction
#[actix::test]
async fn test_multi_chunk_rounds() -> Result<()> {
    let federation = federation(13).await?;
    let owner = federation.gateway_link(Caller::client("owner"));
    let orchestrator = federation.defender_link(Caller::client("orchestrator"));
    owner
        .init_session(&InitSession {
            model_name: "wide".to_string(),
            model_type: WIDE.to_string(),
            rounds: 2,
            reward: 100.0,
            chunk_limit: federation.max_chunks_per_tx(),
        })
        .await?;

    ///////////////////////////////////////////////////////////////////////////////////
    // 1. Three participants submit in two transactions each
    ///////////////////////////////////////////////////////////////////////////////////
    let locals = [wide_model(1), wide_model(2), wide_model(3)];
    for (i, local) in locals.iter().enumerate() {
        let receipt = federation
            .client(&format!("participant-{i}"))
            .submit(local)
            .await?;
        assert_eq!(receipt.series_length, 2);
        assert!(receipt.score.is_finite());
    }

    ///////////////////////////////////////////////////////////////////////////////////
    // 2. The published mean keeps the model's shape
    ///////////////////////////////////////////////////////////////////////////////////
    orchestrator.apply_poison_defense().await?;
    let outcome = owner
        .private_aggregation(federation.max_chunks_per_tx())
        .await?;
    let published = outcome
        .published
        .ok_or_else(|| anyhow!("a three model round must publish"))?;

    let global = federation.client("participant-0").global_model().await?;
    for (name, tensor) in &wide_model(0) {
        assert_eq!(global.get(name).and_then(|t| t.shape()), tensor.shape());
    }
    let local_values = locals
        .iter()
        .map(|m| values_of(m, WIDE))
        .collect::<Result<Vec<_>>>()?;
    assert!(close(&values_of(&global, WIDE)?, &mean_of(&local_values), 1e-2));

    ///////////////////////////////////////////////////////////////////////////////////
    // 3. A lone multi chunk submission counts as a single anomaly
    ///////////////////////////////////////////////////////////////////////////////////
    federation.client("participant-2").submit(&wide_model(4)).await?;
    orchestrator.apply_poison_defense().await?;
    let outcome = owner
        .private_aggregation(federation.max_chunks_per_tx())
        .await?;
    assert_eq!(outcome.published, None);
    assert_eq!(owner.global_model().await?.id, published);

    let settled = orchestrator.apply_poison_defense().await?;
    assert_eq!(settled.anomaly.phi, 1);
    Ok(())
}
