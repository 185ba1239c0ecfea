// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{mask_and_encrypt, masking_offset};
use anyhow::Result;
use hefl_config::ClientConfig;
use hefl_fhe::HeContext;
use hefl_model::{flatten, plan_series, reassemble, TensorCollection};
use hefl_protocol::{CommitLocalModel, GatewayLink, StoreLocalModelChunk};
use hefl_utils::SharedRng;
use tracing::{debug, info};

/// Outcome of one submitted model
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub id: String,
    pub score: f64,
    /// Number of transactions the upload took
    pub series_length: usize,
}

/// A participant's view of the federation
#[derive(Clone)]
pub struct FederationClient {
    gateway: GatewayLink,
    rng: SharedRng,
    noise_range: f64,
    max_chunks_per_tx: usize,
}

impl FederationClient {
    pub fn new(
        gateway: GatewayLink,
        rng: SharedRng,
        config: &ClientConfig,
        max_chunks_per_tx: usize,
    ) -> Self {
        Self {
            gateway,
            rng,
            noise_range: config.noise_range,
            max_chunks_per_tx,
        }
    }

    /// Flatten a trained model along the layers of the current global model and submit it
    pub async fn submit(&self, tensors: &TensorCollection) -> Result<Receipt> {
        let global = self.gateway.global_model().await?;
        let flat = flatten(tensors, &global.structure.layers)?;
        self.submit_values(&flat.values).await
    }

    /// Mask, encrypt, upload and commit a flat run of values.
    ///
    /// Safe to retry: the model id is a digest of the uploaded ciphertexts, restoring a part
    /// overwrites it and a second commit of the same id returns the first score.
    pub async fn submit_values(&self, values: &[f64]) -> Result<Receipt> {
        let context = self.gateway.encryption_context().await?;
        let he = HeContext::from_context(&context, self.rng.clone())?;
        let offset = masking_offset(values, self.noise_range, &self.rng)?;
        let masked = mask_and_encrypt(&he, values, offset)?;

        let plan = plan_series(&masked.chunks, self.max_chunks_per_tx);
        let series_length = plan.len();
        for (series, chunk) in plan {
            let stored = self
                .gateway
                .store_local_model_chunk(&StoreLocalModelChunk {
                    id: masked.id.clone(),
                    chunk,
                    series,
                })
                .await?;
            debug!("Stored part {} of {}", stored.completed, stored.id);
        }

        let score = self
            .gateway
            .commit_local_model(&CommitLocalModel {
                id: masked.id.clone(),
                delta: masked.delta,
                series_length,
            })
            .await?;
        info!("Committed model {} with score {:.4}", masked.id, score);

        Ok(Receipt {
            id: masked.id,
            score,
            series_length,
        })
    }

    /// The published global model, rebuilt into named tensors
    pub async fn global_model(&self) -> Result<TensorCollection> {
        let global = self.gateway.global_model().await?;
        let values: Vec<f64> = global.model.into_iter().flatten().collect();
        Ok(reassemble(
            &values,
            &global.structure.shapes,
            &global.structure.layers,
        )?)
    }
}
