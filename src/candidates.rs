//! Candidate generation: vector refinement and nearest-neighbor expansion.
//!
//! Refines the pruned candidate set with cosine similarity when embedding
//! vectors are available on both sides, and expands each vectored chunk
//! with its top-k nearest neighbors from the opposing *full* document to
//! catch reordered content the length banding may have separated. Chunks
//! without vectors keep their fingerprint-estimated similarity unchanged.
//!
//! The layout-aware strategy additionally folds page distance into each
//! pair's locality distance, so the per-chunk cap retains same-page
//! candidates ahead of equally similar content from distant pages.

use std::collections::BTreeMap;

use crate::config::{CompareConfig, Strategy};
use crate::types::candidate::{CandidatePair, EmbeddingVector};
use crate::types::chunk::{Chunk, ChunkId};
use crate::types::fingerprint::Fingerprint;

/// Weight of one page of distance relative to one order-index step in the
/// locality tie-break.
const PAGE_DISTANCE_WEIGHT: u32 = 16;

/// Error raised while building or querying the per-run vector index.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VectorIndexError {
    /// A vector's dimension disagrees with the first vector seen.
    #[error("Embedding dimension mismatch for {chunk_id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Chunk whose vector had the wrong dimension.
        chunk_id: ChunkId,
        /// Dimension established by the first vector.
        expected: usize,
        /// Dimension actually supplied.
        actual: usize,
    },
}

/// Brute-force cosine index over one document's embedding vectors.
///
/// Built once per run and borrowed by the candidate generator; it holds no
/// state beyond the vectors themselves. Exact search keeps the candidate
/// stage deterministic; the chunk-count scale per document does not
/// justify an approximate structure.
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<(ChunkId, Vec<f32>)>,
}

impl VectorIndex {
    /// Build an index from vectors in document order.
    pub fn build<'a, I>(vectors: I) -> Result<Self, VectorIndexError>
    where
        I: IntoIterator<Item = &'a EmbeddingVector>,
    {
        let mut dimension = 0;
        let mut entries = Vec::new();
        for ev in vectors {
            if dimension == 0 {
                dimension = ev.vector.len();
            } else if ev.vector.len() != dimension {
                return Err(VectorIndexError::DimensionMismatch {
                    chunk_id: ev.chunk_id.clone(),
                    expected: dimension,
                    actual: ev.vector.len(),
                });
            }
            entries.push((ev.chunk_id.clone(), ev.vector.clone()));
        }
        Ok(Self { dimension, entries })
    }

    /// Number of vectors in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimension established by the first indexed vector; 0 when empty.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Exact top-k nearest neighbors by cosine similarity.
    ///
    /// Returns `(chunk_id, similarity)` sorted by similarity descending,
    /// ties broken by document order for determinism.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&ChunkId, f32)> {
        if query.len() != self.dimension {
            return Vec::new();
        }
        let mut scored: Vec<(usize, &ChunkId, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, (id, vector))| (pos, id, cosine_similarity(query, vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored.into_iter().map(|(_, id, sim)| (id, sim)).collect()
    }
}

/// Cosine similarity of two vectors; 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Locality distance between two chunks at positions `i` and `j`.
///
/// Order-index distance for most strategies; the layout-aware strategy
/// adds weighted page distance so same-page pairs sort ahead.
fn locality_distance(
    left: &Chunk,
    right: &Chunk,
    i: usize,
    j: usize,
    strategy: Strategy,
) -> u32 {
    let order = i.abs_diff(j) as u32;
    if strategy.weights_page_locality() {
        order + PAGE_DISTANCE_WEIGHT * left.page_no.abs_diff(right.page_no)
    } else {
        order
    }
}

/// Refine pruned candidates with vector similarity and knn expansion.
///
/// Chunk and fingerprint slices must be parallel and in document order;
/// positional indexes double as order indexes. Output is deduplicated,
/// capped per left chunk, and sorted by (left position, right position)
/// for determinism.
#[allow(clippy::too_many_arguments)]
pub fn refine(
    candidates: Vec<CandidatePair>,
    left: &[Chunk],
    right: &[Chunk],
    left_fps: &[Fingerprint],
    right_fps: &[Fingerprint],
    left_vectors: &BTreeMap<ChunkId, EmbeddingVector>,
    right_vectors: &BTreeMap<ChunkId, EmbeddingVector>,
    strategy: Strategy,
    config: &CompareConfig,
) -> Result<Vec<CandidatePair>, VectorIndexError> {
    let left_pos: BTreeMap<&ChunkId, usize> =
        left.iter().enumerate().map(|(i, c)| (&c.id, i)).collect();
    let right_pos: BTreeMap<&ChunkId, usize> =
        right.iter().enumerate().map(|(j, c)| (&c.id, j)).collect();

    let use_vectors =
        strategy.uses_vectors() && !left_vectors.is_empty() && !right_vectors.is_empty();

    // One embedding dimension across the whole run: a cross-side
    // disagreement is the same validation failure as one within a side.
    if use_vectors {
        let mut dimension = 0;
        for ev in right_vectors.values().chain(left_vectors.values()) {
            if dimension == 0 {
                dimension = ev.vector.len();
            } else if ev.vector.len() != dimension {
                return Err(VectorIndexError::DimensionMismatch {
                    chunk_id: ev.chunk_id.clone(),
                    expected: dimension,
                    actual: ev.vector.len(),
                });
            }
        }
    }

    let mut by_cell: BTreeMap<(usize, usize), CandidatePair> = BTreeMap::new();
    for mut pair in candidates {
        let (Some(&i), Some(&j)) = (
            left_pos.get(&pair.left_chunk_id),
            right_pos.get(&pair.right_chunk_id),
        ) else {
            continue;
        };

        if use_vectors {
            if let (Some(lv), Some(rv)) = (
                left_vectors.get(&pair.left_chunk_id),
                right_vectors.get(&pair.right_chunk_id),
            ) {
                let cosine = f64::from(cosine_similarity(&lv.vector, &rv.vector));
                pair.similarity = cosine.clamp(0.0, 1.0);
            }
        }
        pair.order_distance = locality_distance(&left[i], &right[j], i, j, strategy);
        by_cell.insert((i, j), pair);
    }

    // Expansion against the opposing full document, not just the pruned
    // set: reordered content may sit in a distant length band.
    if use_vectors && strategy.uses_knn_expansion() {
        let index = VectorIndex::build(
            right_fps
                .iter()
                .filter_map(|fp| right_vectors.get(&fp.chunk_id)),
        )?;

        for (i, fp) in left_fps.iter().enumerate() {
            let Some(lv) = left_vectors.get(&fp.chunk_id) else {
                continue;
            };
            for (right_id, cosine) in index.search(&lv.vector, config.knn_k) {
                let j = right_pos[right_id];
                let cell = (i, j);
                if by_cell.contains_key(&cell) {
                    continue;
                }
                let pair = CandidatePair::new(
                    fp.chunk_id.clone(),
                    right_id.clone(),
                    f64::from(cosine).clamp(0.0, 1.0),
                    fp.similarity(&right_fps[j]),
                    locality_distance(&left[i], &right[j], i, j, strategy),
                );
                by_cell.insert(cell, pair);
            }
        }
    }

    // Cap candidates per left chunk, keeping the best by the pair ordering
    // (similarity, fingerprint agreement, locality distance).
    let mut per_left: BTreeMap<usize, Vec<((usize, usize), CandidatePair)>> = BTreeMap::new();
    for (cell, pair) in by_cell {
        per_left.entry(cell.0).or_default().push((cell, pair));
    }

    let mut kept = Vec::new();
    for (_, mut pairs) in per_left {
        pairs.sort_by(|a, b| b.1.cmp(&a.1));
        pairs.truncate(config.max_candidates_per_chunk);
        kept.extend(pairs);
    }

    kept.sort_by_key(|(cell, _)| *cell);
    Ok(kept.into_iter().map(|(_, pair)| pair).collect())
}
