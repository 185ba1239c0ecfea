// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Arbitrarily nested numeric tensor as found in exported model weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tensor {
    Scalar(f64),
    List(Vec<Tensor>),
}

/// Named layers of a model
pub type TensorCollection = BTreeMap<String, Tensor>;

impl Tensor {
    /// Dimension sizes, outermost first. `None` if sibling sub-tensors disagree in shape.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Tensor::Scalar(_) => Some(vec![]),
            Tensor::List(items) => {
                let Some((first, rest)) = items.split_first() else {
                    return Some(vec![0]);
                };
                let inner = first.shape()?;
                for item in rest {
                    if item.shape()? != inner {
                        return None;
                    }
                }
                let mut shape = Vec::with_capacity(inner.len() + 1);
                shape.push(items.len());
                shape.extend(inner);
                Some(shape)
            }
        }
    }

    /// Append all leaf values in row-major order
    pub fn flatten_into(&self, out: &mut Vec<f64>) {
        match self {
            Tensor::Scalar(v) => out.push(*v),
            Tensor::List(items) => items.iter().for_each(|t| t.flatten_into(out)),
        }
    }

    /// Rebuild a tensor from row-major values. `values` must hold exactly the product of `shape`.
    pub fn from_shape(values: &[f64], shape: &[usize]) -> Tensor {
        match shape.split_first() {
            None => Tensor::Scalar(values.first().copied().unwrap_or_default()),
            Some((&outer, inner)) => {
                let stride: usize = inner.iter().product();
                Tensor::List(
                    (0..outer)
                        .map(|i| {
                            let start = (i * stride).min(values.len());
                            let end = (start + stride).min(values.len());
                            Tensor::from_shape(&values[start..end], inner)
                        })
                        .collect(),
                )
            }
        }
    }
}

pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}
