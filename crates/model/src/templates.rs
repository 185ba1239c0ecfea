// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::CodecError;
use std::collections::BTreeMap;

const MNIST: &[&str] = &["layer1.0.weight", "layer1.0.bias", "fc.weight", "fc.bias"];

const FASHION: &[&str] = &[
    "layer1.0.weight",
    "layer1.0.bias",
    "layer1.1.weight",
    "layer1.1.bias",
    "layer2.0.weight",
    "layer2.0.bias",
    "layer2.1.weight",
    "layer2.1.bias",
    "fc.weight",
    "fc.bias",
];

const CIFAR10: &[&str] = &[
    "conv1.weight",
    "conv1.bias",
    "layer1.0.fn.0.weight",
    "layer1.0.fn.0.bias",
    "layer1.0.fn.2.weight",
    "layer1.0.fn.2.bias",
    "layer1.1.weight",
    "layer1.1.bias",
    "layer1.3.weight",
    "layer1.3.bias",
    "layer2.0.fn.0.weight",
    "layer2.0.fn.0.bias",
    "layer2.0.fn.2.weight",
    "layer2.0.fn.2.bias",
    "layer2.1.weight",
    "layer2.1.bias",
    "layer2.3.weight",
    "layer2.3.bias",
    "layer3.0.fn.0.weight",
    "layer3.0.fn.0.bias",
    "layer3.0.fn.2.weight",
    "layer3.0.fn.2.bias",
    "layer3.1.weight",
    "layer3.1.bias",
    "layer3.3.weight",
    "layer3.3.bias",
    "fc.weight",
    "fc.bias",
];

/// Ordered layer name lists keyed by model type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTemplates {
    templates: BTreeMap<String, Vec<String>>,
}

impl Default for LayerTemplates {
    fn default() -> Self {
        let templates = [("MNIST", MNIST), ("Fashion", FASHION), ("CIFAR10", CIFAR10)]
            .into_iter()
            .map(|(name, layers)| {
                (
                    name.to_string(),
                    layers.iter().map(|l| l.to_string()).collect(),
                )
            })
            .collect();
        Self { templates }
    }
}

impl LayerTemplates {
    /// Built-in templates with `extra` merged over them
    pub fn with_extra(extra: &BTreeMap<String, Vec<String>>) -> Self {
        let mut templates = Self::default();
        templates
            .templates
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        templates
    }

    pub fn get(&self, model_type: &str) -> Result<&[String], CodecError> {
        self.templates
            .get(model_type)
            .map(Vec::as_slice)
            .ok_or_else(|| CodecError::UnknownTemplate(model_type.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}
