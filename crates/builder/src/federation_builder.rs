// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::Federation;
use actix::{Actor, AsyncContext, Context};
use anyhow::{anyhow, Result};
use hefl_config::{load_config, AppConfig};
use hefl_data::{DataStore, InMemStore, SledStore};
use hefl_defender::{AcceptAll, Defender, DefenderParams, PoisonDefense};
use hefl_gateway::{Gateway, GatewayParams};
use hefl_model::{JsonModelDir, LayerTemplates, ModelSource};
use hefl_protocol::{Caller, DefenderLink, GatewayLink, Service};
use hefl_utils::SharedRng;
use std::sync::Arc;
use tracing::info;

/// Build a federation: one store, one Defender, one Gateway, linked to each other.
pub struct FederationBuilder {
    config: AppConfig,
    rng: SharedRng,
    datastore: Option<DataStore>,
    models: Option<Arc<dyn ModelSource>>,
    defense: Arc<dyn PoisonDefense>,
    logging: bool,
}

impl FederationBuilder {
    pub fn new(config: AppConfig, rng: SharedRng) -> Self {
        Self {
            config,
            rng,
            datastore: None,
            models: None,
            defense: Arc::new(AcceptAll),
            logging: false,
        }
    }

    /// Start from the layered configuration: defaults, then the YAML file, then `HEFL_`
    /// environment variables
    pub fn from_config_file(config_file: Option<&str>, rng: SharedRng) -> Result<Self> {
        Ok(Self::new(load_config(config_file)?, rng))
    }

    /// Attach an existing store instead of opening the configured one
    pub fn with_datastore(mut self, store: DataStore) -> Self {
        self.datastore = Some(store);
        self
    }

    /// Where initial models come from. Defaults to the configured models directory.
    pub fn with_models(mut self, models: Arc<dyn ModelSource>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn with_defense(mut self, defense: Arc<dyn PoisonDefense>) -> Self {
        self.defense = defense;
        self
    }

    /// Log store activity of a fresh in memory store
    pub fn with_logging(mut self) -> Self {
        self.logging = true;
        self
    }

    fn open_store(&self) -> Result<DataStore> {
        if let Some(store) = &self.datastore {
            return Ok(store.clone());
        }
        if self.config.data.in_mem {
            info!("Using in memory store");
            return Ok((&InMemStore::new(self.logging).start()).into());
        }
        let path = self.config.db_path();
        info!("Using sled store at {}", path.display());
        Ok((&SledStore::new(&path)?).into())
    }

    fn model_source(&self) -> Result<Arc<dyn ModelSource>> {
        if let Some(models) = &self.models {
            return Ok(models.clone());
        }
        let dir = self
            .config
            .models_dir()
            .ok_or_else(|| anyhow!("No model source was given and models.dir is not set"))?;
        Ok(Arc::new(JsonModelDir::new(dir)))
    }

    pub async fn build(self) -> Result<Federation> {
        let store = self.open_store()?;
        let models = self.model_source()?;

        // The Defender needs the Gateway's address before the Gateway exists
        let ctx = Context::<Gateway>::new();
        let defender = Defender::load(
            DefenderParams {
                fhe: self.config.fhe.clone(),
                flat_tolerance: self.config.defender.flat_tolerance,
                rng: self.rng.clone(),
                defense: self.defense.clone(),
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
                rng: self.rng.clone(),
                defender: DefenderLink::new(
                    defender.clone().recipient(),
                    Caller::Service(Service::Gateway),
                ),
                models,
                templates: LayerTemplates::with_extra(&self.config.models.templates),
            },
            &store,
        )
        .await?;
        let gateway = ctx.run(gateway);
        info!("Federation is up");

        Ok(Federation::new(
            gateway,
            defender,
            store,
            self.rng,
            self.config.client,
            self.config.gateway.max_chunks_per_tx,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hefl_protocol::InitSession;
    use hefl_test_helpers::{
        in_mem_store, init_test_tracing, sample_models, test_fhe_config, test_templates, TINY,
    };
    use hefl_utils::create_shared_rng_from_u64;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.fhe = test_fhe_config();
        config.models.templates = test_templates();
        config.data.in_mem = true;
        config
    }

    fn init() -> InitSession {
        InitSession {
            model_name: "tiny".to_string(),
            model_type: TINY.to_string(),
            rounds: 2,
            reward: 100.0,
            chunk_limit: 60,
        }
    }

    #[actix::test]
    async fn needs_a_model_source() {
        let result = FederationBuilder::new(config(), create_shared_rng_from_u64(1))
            .build()
            .await;
        assert!(result.is_err());
    }

    #[actix::test]
    async fn gateway_state_survives_a_restart() -> Result<()> {
        init_test_tracing();
        let (store, _) = in_mem_store();
        let build = || {
            FederationBuilder::new(config(), create_shared_rng_from_u64(1))
                .with_datastore(store.clone())
                .with_models(Arc::new(sample_models()))
                .build()
        };

        let first = build().await?;
        let owner = first.gateway_link(Caller::client("owner"));
        owner.init_session(&init()).await?;
        let context = owner.encryption_context().await?;
        let global = owner.global_model().await?;

        let second = build().await?;
        let owner = second.gateway_link(Caller::client("owner"));
        assert_eq!(owner.encryption_context().await?, context);
        assert_eq!(owner.global_model().await?, global);
        assert_eq!(owner.training_sessions().await?.len(), 1);
        Ok(())
    }

    #[actix::test]
    async fn opens_a_sled_store() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = config();
        config.data.in_mem = false;
        config.data.db_path = dir.path().join("db");

        let federation = FederationBuilder::new(config, create_shared_rng_from_u64(1))
            .with_models(Arc::new(sample_models()))
            .build()
            .await?;
        let owner = federation.gateway_link(Caller::client("owner"));
        owner.init_session(&init()).await?;
        assert_eq!(owner.training_sessions().await?.len(), 1);
        Ok(())
    }

    #[actix::test]
    async fn builds_from_a_config_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let models = dir.path().join("models");
        std::fs::create_dir(&models)?;
        std::fs::write(
            models.join("tiny.json"),
            r#"{"fc.weight": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]], "fc.bias": [0.01, 0.02]}"#,
        )?;
        let file = dir.path().join("hefl.config.yaml");
        // The models directory resolves against the config file's location
        std::fs::write(
            &file,
            r#"
fhe:
  preset: insecure_2048
data:
  in_mem: true
models:
  dir: models
  templates:
    Tiny:
      - fc.weight
      - fc.bias
"#,
        )?;

        let federation = FederationBuilder::from_config_file(
            file.to_str(),
            create_shared_rng_from_u64(1),
        )?
        .build()
        .await?;
        let owner = federation.gateway_link(Caller::client("owner"));
        owner.init_session(&init()).await?;
        let global = owner.global_model().await?;
        assert_eq!(global.structure.shapes, vec![vec![2, 3], vec![2]]);
        assert_eq!(global.model, vec![vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.01, 0.02]]);
        Ok(())
    }
}
