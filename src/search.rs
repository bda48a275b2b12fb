//! Cosine-similarity lookup over a written embedding document.
//!
//! Brute force over every record; documents here are small. Repeated queries are served
//! from an LRU keyed by the query vector's exact bit pattern and `top_k`.

use std::num::NonZeroUsize;
use std::path::Path;

use fxhash::FxBuildHasher;
use lru::LruCache;
use serde::Serialize;

use crate::record::{read_embeddings, EmbeddingRecord};
use crate::PipelineError;

/// One scored hit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Match {
    pub id: String,
    pub score: f32,
}

/// Cache key compared on the full vector, so a hash collision can never return
/// another query's results.
#[derive(Hash, PartialEq, Eq)]
struct QueryKey {
    bits: Vec<u32>,
    top_k: usize,
}

impl QueryKey {
    fn new(vector: &[f32], top_k: usize) -> Self {
        Self {
            bits: bytemuck::cast_slice::<f32, u32>(vector).to_vec(),
            top_k,
        }
    }
}

pub struct EmbeddingIndex {
    records: Vec<EmbeddingRecord>,
    dimension: usize,
    cache: Option<LruCache<QueryKey, Vec<Match>, FxBuildHasher>>,
}

impl EmbeddingIndex {
    /// Builds an index over `records`. A `cache_capacity` of 0 disables memoization.
    pub fn from_records(
        records: Vec<EmbeddingRecord>,
        cache_capacity: usize,
    ) -> Result<Self, PipelineError> {
        let dimension = records.first().map_or(0, |r| r.vector.len());
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            return Err(PipelineError::DimensionMismatch {
                expected: dimension,
                actual: bad.vector.len(),
            });
        }

        Ok(Self {
            records,
            dimension,
            cache: NonZeroUsize::new(cache_capacity)
                .map(|cap| LruCache::with_hasher(cap, FxBuildHasher::default())),
        })
    }

    /// Loads the JSON document at `path` and indexes it.
    pub fn load(path: &Path, cache_capacity: usize) -> Result<Self, PipelineError> {
        let records = read_embeddings(path)?;
        if records.is_empty() {
            tracing::warn!(path = %path.display(), "embedding document is empty");
        } else {
            tracing::debug!(records = records.len(), path = %path.display(), "embedding index loaded");
        }
        Self::from_records(records, cache_capacity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns up to `top_k` records most similar to `vector`, best first.
    /// Equal scores are ordered by id.
    pub fn query(&mut self, vector: &[f32], top_k: usize) -> Result<Vec<Match>, PipelineError> {
        if !self.records.is_empty() && vector.len() != self.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if top_k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }

        let key = QueryKey::new(vector, top_k);
        if let Some(hit) = self.cache.as_mut().and_then(|cache| cache.get(&key)) {
            return Ok(hit.clone());
        }

        let mut results: Vec<Match> = self
            .records
            .iter()
            .map(|record| Match {
                id: record.id.clone(),
                score: cosine_similarity(&record.vector, vector),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(top_k);

        if let Some(cache) = self.cache.as_mut() {
            cache.put(key, results.clone());
        }
        Ok(results)
    }

    #[cfg(test)]
    fn cached_queries(&self) -> usize {
        self.cache.as_ref().map_or(0, LruCache::len)
    }
}

/// Cosine similarity; 0.0 when either side has zero length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("records", &self.records.len())
            .field("dimension", &self.dimension)
            .finish()
    }
}
