//! Exact nearest-neighbour index over artifact embeddings.
//!
//! Brute-force squared-L2 against every stored vector. Corpora here are tens to low
//! thousands of artifacts, so exactness wins over an approximate structure.
//!
//! The index is a projection of the corpus: it can always be rebuilt from the corpus and
//! an [`EmbeddingProvider`](crate::embedding::EmbeddingProvider).

pub mod error;


pub use error::{IndexError, IndexResult};

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::constants::{DimValidationError, validate_embedding_dim};
use crate::corpus::ArtifactId;

/// A stored vector and the artifact it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub artifact_id: ArtifactId,
    pub vector: Vec<f32>,
}

/// One search result. Smaller distance means more similar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub artifact_id: ArtifactId,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// Insertion-ordered vector store with a single fixed dimension.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    positions: HashMap<ArtifactId, usize>,
    dim: Option<usize>,
}

impl From<DimValidationError> for IndexError {
    fn from(err: DimValidationError) -> Self {
        match err {
            DimValidationError::ZeroDimension => IndexError::ZeroDimension,
            DimValidationError::DimensionMismatch { expected, actual } => {
                IndexError::DimensionMismatch { expected, actual }
            }
        }
    }
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the index contents.
    ///
    /// All vectors must share one dimension. On error the previous contents are kept.
    pub fn build<I>(&mut self, entries: I) -> IndexResult<()>
    where
        I: IntoIterator<Item = (ArtifactId, Vec<f32>)>,
    {
        let mut next = Self::new();
        for (artifact_id, vector) in entries {
            next.add(artifact_id, vector)?;
        }

        debug!(entries = next.len(), dim = ?next.dim, "Vector index built");
        *self = next;
        Ok(())
    }

    /// Inserts one vector. Re-adding an id replaces its vector but keeps its position.
    pub fn add(&mut self, artifact_id: ArtifactId, vector: Vec<f32>) -> IndexResult<()> {
        let expected = self.dim.unwrap_or(vector.len());
        validate_embedding_dim(vector.len(), expected)?;

        if let Some(&pos) = self.positions.get(&artifact_id) {
            self.entries[pos].vector = vector;
        } else {
            self.positions.insert(artifact_id.clone(), self.entries.len());
            self.entries.push(IndexEntry {
                artifact_id,
                vector,
            });
        }
        self.dim = Some(expected);
        Ok(())
    }

    /// The `k` nearest entries by squared L2, ascending. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<SearchHit>> {
        let dim = self.dim.ok_or(IndexError::EmptyIndex)?;
        if self.entries.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        validate_embedding_dim(query.len(), dim)?;

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, squared_l2(query, &entry.vector)))
            .collect();

        // Stable sort: equal distances stay in insertion order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, distance)| SearchHit {
                artifact_id: self.entries[pos].artifact_id.clone(),
                distance,
            })
            .collect())
    }

    /// Stored vector for `artifact_id`.
    pub fn vector(&self, artifact_id: &ArtifactId) -> Option<&[f32]> {
        self.positions
            .get(artifact_id)
            .map(|&pos| self.entries[pos].vector.as_slice())
    }

    pub fn contains(&self, artifact_id: &ArtifactId) -> bool {
        self.positions.contains_key(artifact_id)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Vector dimension, fixed by the first insert.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
