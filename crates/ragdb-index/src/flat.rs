//! Exact inner-product index over L2-normalized vectors.
//!
//! Corpus sizes here are small enough that brute-force search over every
//! row is cheap, avoids approximate-index tuning entirely, and gives exact
//! top-k. Because all rows and queries are normalized before search, inner
//! product equals cosine similarity.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Row `i` of the index corresponds to entry `i` of the chunk list
/// persisted next to it; the pair is only ever written together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(anyhow!(
                "vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dim
            ));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Exact top-k by inner product, descending. Returns `(row, score)`
    /// pairs; never more than `top_k`, and never a fabricated row when the
    /// index holds fewer vectors than requested. The sort is stable, so
    /// equal scores keep ordinal order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim {
            return Err(anyhow!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dim
            ));
        }
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, v)| {
                let score = v.iter().zip(query).map(|(a, b)| a * b).sum::<f32>();
                (row, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        bincode::serialize_into(file, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(file)?)
    }
}

/// L2-normalize in place. Zero vectors are left untouched rather than
/// divided into NaNs.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
