// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::TensorCollection;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Where initial global models come from
pub trait ModelSource: Send + Sync {
    fn load(&self, name: &str) -> Result<TensorCollection>;
}

/// Reads `<dir>/<name>.json` holding a map of layer name to nested arrays
#[derive(Debug, Clone)]
pub struct JsonModelDir {
    dir: PathBuf,
}

impl JsonModelDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ModelSource for JsonModelDir {
    fn load(&self, name: &str) -> Result<TensorCollection> {
        let path = self.dir.join(format!("{name}.json"));
        debug!("Loading model from {}", path.display());
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read model file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Model file {} is not a tensor map", path.display()))
    }
}

/// Models held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticModels {
    models: BTreeMap<String, TensorCollection>,
}

impl StaticModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, model: TensorCollection) -> Self {
        self.models.insert(name.to_string(), model);
        self
    }
}

impl ModelSource for StaticModels {
    fn load(&self, name: &str) -> Result<TensorCollection> {
        self.models
            .get(name)
            .cloned()
            .with_context(|| format!("No model named '{name}'"))
    }
}
