// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{element_count, CodecError, Tensor, TensorCollection};
use serde::{Deserialize, Serialize};

/// A model reduced to one ordered run of values plus what is needed to undo it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatModel {
    pub values: Vec<f64>,
    /// Layer names in the order their values appear
    pub layers: Vec<String>,
    /// Per layer dimension sizes, outermost first
    pub shapes: Vec<Vec<usize>>,
}

/// Keep the layers named by `template`, in template order, and concatenate their values.
/// Layers absent from the collection are skipped, layers absent from the template dropped.
pub fn flatten(tensors: &TensorCollection, template: &[String]) -> Result<FlatModel, CodecError> {
    let mut flat = FlatModel {
        values: vec![],
        layers: vec![],
        shapes: vec![],
    };

    for name in template {
        let Some(tensor) = tensors.get(name) else {
            continue;
        };
        let shape = tensor
            .shape()
            .ok_or_else(|| CodecError::Ragged(name.clone()))?;
        tensor.flatten_into(&mut flat.values);
        flat.layers.push(name.clone());
        flat.shapes.push(shape);
    }

    Ok(flat)
}

/// Inverse of [`flatten`]. `layers[i]` names the tensor described by `shapes[i]`.
pub fn reassemble(
    values: &[f64],
    shapes: &[Vec<usize>],
    layers: &[String],
) -> Result<TensorCollection, CodecError> {
    if layers.len() < shapes.len() {
        return Err(CodecError::MissingLayerNames {
            shapes: shapes.len(),
            layers: layers.len(),
        });
    }

    let expected: usize = shapes.iter().map(|s| element_count(s)).sum();
    if values.len() != expected {
        return Err(CodecError::LengthMismatch {
            expected,
            actual: values.len(),
        });
    }

    let mut model = TensorCollection::new();
    let mut offset = 0;
    for (shape, name) in shapes.iter().zip(layers) {
        let len = element_count(shape);
        let tensor = Tensor::from_shape(&values[offset..offset + len], shape);
        model.insert(name.clone(), tensor);
        offset += len;
    }
    Ok(model)
}
