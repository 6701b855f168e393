//! Brute-force flat vector index with exact squared-L2 search.
//!
//! Vectors are stored contiguously as f16 and compared in f32. Every stored
//! vector is identified by its offset (insertion order), which the metadata
//! store maps back to files via `[vector_start_idx, vector_end_idx)` ranges.

use half::f16;

use crate::error::IndexError;

/// A single search result from [`FlatIndex::search`].
///
/// When the index holds fewer than `k` vectors, results are padded with
/// sentinel hits (`offset == -1`, infinite distance) so the caller always
/// receives exactly `k` entries. Callers must filter sentinels before
/// resolving offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Insertion-order offset of the matched vector, or -1 for padding.
    pub offset: i64,
    /// Squared L2 distance between query and stored vector.
    pub distance: f32,
}

impl SearchHit {
    /// Padding entry returned when the index has fewer vectors than requested.
    pub const SENTINEL: SearchHit = SearchHit {
        offset: -1,
        distance: f32::INFINITY,
    };

    pub fn is_sentinel(&self) -> bool {
        self.offset < 0
    }
}

/// Exact nearest-neighbor index over a flat f16 vector store.
///
/// The dimension is fixed at construction; every added vector must match it.
/// Search is a full scan, which is the right trade-off for local document
/// collections (thousands of chunks, not millions).
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    /// All vectors back to back, `len() == count() * dimension`.
    data: Vec<f16>,
}

impl FlatIndex {
    /// Creates an empty index. Dimension zero is rejected so `count` stays
    /// well-defined.
    pub fn new(dimension: usize) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::InvalidDimension);
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Reconstructs an index from a raw f16 buffer, e.g. a decoded snapshot.
    pub fn from_raw(dimension: usize, data: Vec<f16>) -> Result<Self, IndexError> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(IndexError::CorruptSnapshot {
                reason: format!(
                    "vector buffer of {} f16 values is not a multiple of dimension {}",
                    data.len(),
                    dimension
                ),
            });
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors stored.
    pub fn count(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw contiguous f16 storage, for snapshot serialization.
    pub fn raw(&self) -> &[f16] {
        &self.data
    }

    /// Appends a vector and returns its offset.
    pub fn add(&mut self, vector: &[f16]) -> Result<i64, IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let offset = self.count() as i64;
        self.data.extend_from_slice(vector);
        Ok(offset)
    }

    /// Appends a batch of vectors and returns the offset of the first one.
    pub fn add_batch(&mut self, vectors: &[Vec<f16>]) -> Result<i64, IndexError> {
        let start = self.count() as i64;
        for vector in vectors {
            self.add(vector)?;
        }
        Ok(start)
    }

    /// Finds the `k` nearest stored vectors to `query` by squared L2 distance.
    ///
    /// Always returns exactly `k` hits, padding with [`SearchHit::SENTINEL`]
    /// when fewer vectors exist. Ties break by lower offset first, so results
    /// are deterministic for identical inputs.
    pub fn search(&self, query: &[f16], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let query_f32: Vec<f32> = query.iter().map(|v| v.to_f32()).collect();
        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(offset, stored)| {
                let distance = stored
                    .iter()
                    .zip(&query_f32)
                    .map(|(s, q)| {
                        let d = s.to_f32() - q;
                        d * d
                    })
                    .sum();
                SearchHit {
                    offset: offset as i64,
                    distance,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.offset.cmp(&b.offset))
        });
        hits.truncate(k);
        hits.resize(k, SearchHit::SENTINEL);
        Ok(hits)
    }
}
