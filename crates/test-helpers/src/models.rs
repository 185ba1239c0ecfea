// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use hefl_model::{StaticModels, Tensor, TensorCollection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

pub const TINY: &str = "Tiny";
pub const WIDE: &str = "Wide";

/// Layer templates for [`tiny_model`] and [`wide_model`]
pub fn test_templates() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            TINY.to_string(),
            vec!["fc.weight".to_string(), "fc.bias".to_string()],
        ),
        (
            WIDE.to_string(),
            vec!["dense.weight".to_string(), "dense.bias".to_string()],
        ),
    ])
}

fn matrix(rows: Vec<Vec<f64>>) -> Tensor {
    Tensor::List(
        rows.into_iter()
            .map(|row| Tensor::List(row.into_iter().map(Tensor::Scalar).collect()))
            .collect(),
    )
}

/// A 2x3 weight matrix and a bias of two, drawn deterministically from `seed`
pub fn tiny_model(seed: u64) -> TensorCollection {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut value = || (rng.gen_range(-1.0..1.0f64) * 1000.0).round() / 1000.0;
    let weight = matrix(vec![
        vec![value(), value(), value()],
        vec![value(), value(), value()],
    ]);
    let bias = Tensor::List(vec![Tensor::Scalar(value()), Tensor::Scalar(value())]);
    TensorCollection::from([
        ("fc.weight".to_string(), weight),
        ("fc.bias".to_string(), bias),
    ])
}

/// A 40x30 weight matrix and a bias of 30, small values drawn from `seed`. At 1230 values it
/// spans two 1024 slot plaintexts of the test parameters.
pub fn wide_model(seed: u64) -> TensorCollection {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut value = || (rng.gen_range(-0.1..0.1f64) * 1000.0).round() / 1000.0;
    let weight = matrix(
        (0..40)
            .map(|_| (0..30).map(|_| value()).collect())
            .collect(),
    );
    let bias = Tensor::List((0..30).map(|_| Tensor::Scalar(value())).collect());
    TensorCollection::from([
        ("dense.weight".to_string(), weight),
        ("dense.bias".to_string(), bias),
    ])
}

/// Initial models served by name: `tiny` holds `tiny_model(0)`, `wide` holds `wide_model(0)`
pub fn sample_models() -> StaticModels {
    StaticModels::new()
        .with("tiny", tiny_model(0))
        .with("wide", wide_model(0))
}
