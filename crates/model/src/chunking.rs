// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::CodecError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Split a flat run of values into plaintext sized pieces. The last piece may be short.
pub fn chunk_values(values: &[f64], slot_count: usize) -> Vec<Vec<f64>> {
    values
        .chunks(slot_count.max(1))
        .map(|c| c.to_vec())
        .collect()
}

/// Transactions needed to write `chunks` ciphertexts at most `max_per_tx` at a time
pub fn transaction_count(chunks: usize, max_per_tx: usize) -> usize {
    chunks.div_ceil(max_per_tx.max(1))
}

/// Ordinal `k/total` tag of one part of a multi-transaction write. `k` counts from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeriesMarker {
    index: usize,
    total: usize,
}

impl SeriesMarker {
    pub fn new(index: usize, total: usize) -> Result<Self, CodecError> {
        if index == 0 || index > total {
            return Err(CodecError::BadSeriesMarker(format!("{index}/{total}")));
        }
        Ok(Self { index, total })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_last(&self) -> bool {
        self.index == self.total
    }
}

impl fmt::Display for SeriesMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.total)
    }
}

impl FromStr for SeriesMarker {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || CodecError::BadSeriesMarker(s.to_string());
        let (index, total) = s.split_once('/').ok_or_else(bad)?;
        let index = index.trim().parse().map_err(|_| bad())?;
        let total = total.trim().parse().map_err(|_| bad())?;
        SeriesMarker::new(index, total).map_err(|_| bad())
    }
}

impl TryFrom<String> for SeriesMarker {
    type Error = CodecError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeriesMarker> for String {
    fn from(value: SeriesMarker) -> Self {
        value.to_string()
    }
}

/// Group `items` into transaction sized parts, each tagged with its marker
pub fn plan_series<T: Clone>(items: &[T], max_per_tx: usize) -> Vec<(SeriesMarker, Vec<T>)> {
    let total = transaction_count(items.len(), max_per_tx);
    items
        .chunks(max_per_tx.max(1))
        .enumerate()
        .map(|(i, part)| (SeriesMarker { index: i + 1, total }, part.to_vec()))
        .collect()
}

/// Parts of a multi-transaction write collected until complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSeries<T> {
    total: usize,
    parts: BTreeMap<usize, Vec<T>>,
}

impl<T: Clone> ChunkSeries<T> {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            parts: BTreeMap::new(),
        }
    }

    /// Store a part. Rewriting a part replaces it so retried writes are harmless.
    pub fn insert(&mut self, marker: SeriesMarker, part: Vec<T>) -> Result<(), CodecError> {
        if marker.total() != self.total {
            return Err(CodecError::ForeignSeriesPart {
                marker: marker.to_string(),
                total: self.total,
            });
        }
        self.parts.insert(marker.index(), part);
        Ok(())
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.parts.len()
    }

    pub fn is_complete(&self) -> bool {
        self.parts.len() == self.total
    }

    /// Concatenate all parts in marker order
    pub fn assemble(&self) -> Result<Vec<T>, CodecError> {
        if !self.is_complete() {
            return Err(CodecError::IncompleteSeries {
                have: self.parts.len(),
                total: self.total,
            });
        }
        Ok(self.parts.values().flatten().cloned().collect())
    }
}
