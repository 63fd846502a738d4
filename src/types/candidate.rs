//! Candidate pair and embedding vector types.

use serde::{Deserialize, Serialize};

use crate::types::chunk::ChunkId;

/// An embedding vector supplied by an external inference service.
///
/// Optional input: chunks without a vector participate only via
/// fingerprint and token comparison, never vector similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingVector {
    /// The chunk this vector embeds.
    pub chunk_id: ChunkId,
    /// The embedding itself.
    pub vector: Vec<f32>,
    /// Identifier of the model that produced the vector.
    pub model_id: String,
}

impl EmbeddingVector {
    /// Create a new embedding vector.
    pub fn new(chunk_id: impl Into<ChunkId>, vector: Vec<f32>, model_id: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            vector,
            model_id: model_id.into(),
        }
    }
}

/// A tentative cross-document chunk match proposed before alignment.
///
/// Many-to-many: a chunk may appear in several pairs. The alignment kernel
/// later reduces the pair set to a 1:1 (or gapped) path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePair {
    /// Chunk on the left (baseline) side.
    pub left_chunk_id: ChunkId,
    /// Chunk on the right (revised) side.
    pub right_chunk_id: ChunkId,
    /// Similarity estimate in [0, 1].
    pub similarity: f64,
    /// Fingerprint agreement in [0, 1], kept for tie-breaking even after
    /// vector refinement replaces `similarity`.
    pub fingerprint_similarity: f64,
    /// Absolute distance between the two chunks' order indexes.
    pub order_distance: u32,
}

impl CandidatePair {
    /// Create a new candidate pair. Similarity values are clamped to [0, 1].
    pub fn new(
        left_chunk_id: ChunkId,
        right_chunk_id: ChunkId,
        similarity: f64,
        fingerprint_similarity: f64,
        order_distance: u32,
    ) -> Self {
        Self {
            left_chunk_id,
            right_chunk_id,
            similarity: similarity.clamp(0.0, 1.0),
            fingerprint_similarity: fingerprint_similarity.clamp(0.0, 1.0),
            order_distance,
        }
    }
}

// Ordering for candidate selection: higher similarity first, then higher
// fingerprint agreement, then lower order distance (favoring local,
// non-reordered matches), then by ids for determinism.
impl PartialEq for CandidatePair {
    fn eq(&self, other: &Self) -> bool {
        self.left_chunk_id == other.left_chunk_id && self.right_chunk_id == other.right_chunk_id
    }
}

impl Eq for CandidatePair {}

impl PartialOrd for CandidatePair {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CandidatePair {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.similarity.partial_cmp(&other.similarity) {
            Some(std::cmp::Ordering::Equal) | None => {}
            Some(ord) => return ord,
        }
        match self
            .fingerprint_similarity
            .partial_cmp(&other.fingerprint_similarity)
        {
            Some(std::cmp::Ordering::Equal) | None => {}
            Some(ord) => return ord,
        }
        match self.order_distance.cmp(&other.order_distance).reverse() {
            std::cmp::Ordering::Equal => {}
            ord => return ord,
        }
        (&self.left_chunk_id, &self.right_chunk_id)
            .cmp(&(&other.left_chunk_id, &other.right_chunk_id))
    }
}
