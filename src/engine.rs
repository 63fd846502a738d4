//! Comparison engine: validation and stage orchestration.
//!
//! One [`ComparisonEngine`] invocation is a pure function of its request:
//! fingerprints, pruning and vector indexes are built once per run and
//! borrowed into each stage, never cached across runs. Independent runs
//! may therefore execute fully in parallel with no coordination. The
//! engine performs no I/O, no retries and no side-effecting writes, which
//! keeps it idempotent and safe to re-invoke.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use tracing::{debug, info};
use uuid::Uuid;

use crate::align::align;
use crate::candidates::{refine, VectorIndexError};
use crate::classify::{aggregate, classify};
use crate::config::{CompareConfig, ConfigError, Strategy};
use crate::prune::prune;
use crate::sketch::fingerprint;
use crate::types::candidate::EmbeddingVector;
use crate::types::chunk::{Chunk, ChunkId, SourceSide};
use crate::types::fingerprint::Fingerprint;
use crate::types::report::ComparisonRun;

/// Error type for engine operations.
///
/// Deadline expiry and empty documents are deliberately *not* errors:
/// the former yields a truncated-but-flagged run, the latter the
/// all-Insert/all-Delete edge case. No error kind ever returns a partial
/// match list.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// Validation failure; the comparison was aborted before alignment.
    #[error("Input mismatch: {0}")]
    InputMismatch(String),
    /// Configuration violates an ordering constraint.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl From<VectorIndexError> for EngineError {
    fn from(e: VectorIndexError) -> Self {
        Self::InputMismatch(e.to_string())
    }
}

/// One comparison request: two ordered chunk lists plus optional vectors.
#[derive(Debug, Clone)]
pub struct CompareRequest {
    /// Identifier of the left (baseline) document.
    pub left_doc_id: String,
    /// Identifier of the right (revised) document.
    pub right_doc_id: String,
    /// Left chunks in `(page_no, order_index)` order.
    pub left_chunks: Vec<Chunk>,
    /// Right chunks in `(page_no, order_index)` order.
    pub right_chunks: Vec<Chunk>,
    /// Embedding vectors keyed by chunk id; chunks without one degrade to
    /// fingerprint/token comparison.
    pub vectors: Vec<EmbeddingVector>,
    /// Which refinements to enable.
    pub strategy: Strategy,
    /// Optional time budget for the alignment kernel.
    pub deadline: Option<Duration>,
}

impl CompareRequest {
    /// Create a request with no vectors and no deadline.
    pub fn new(
        left_doc_id: impl Into<String>,
        right_doc_id: impl Into<String>,
        left_chunks: Vec<Chunk>,
        right_chunks: Vec<Chunk>,
        strategy: Strategy,
    ) -> Self {
        Self {
            left_doc_id: left_doc_id.into(),
            right_doc_id: right_doc_id.into(),
            left_chunks,
            right_chunks,
            vectors: Vec::new(),
            strategy,
            deadline: None,
        }
    }

    /// Attach embedding vectors.
    pub fn with_vectors(mut self, vectors: Vec<EmbeddingVector>) -> Self {
        self.vectors = vectors;
        self
    }

    /// Attach a time budget.
    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(budget);
        self
    }
}

/// The staged comparison engine.
///
/// Holds only the validated configuration; no shared mutable state exists
/// across runs, so one engine may serve many threads concurrently.
pub struct ComparisonEngine {
    config: CompareConfig,
}

impl ComparisonEngine {
    /// Create an engine with a validated configuration.
    pub fn new(config: CompareConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create an engine with the default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: CompareConfig::default(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Run one full comparison.
    ///
    /// Either the run completes (possibly truncated, clearly flagged) or
    /// it fails with a specific kind and no partial match list.
    pub fn compare(&self, request: CompareRequest) -> Result<ComparisonRun, EngineError> {
        let start = Instant::now();
        let comparison_id = Uuid::new_v4().to_string();
        let params_hash = self.config.params_hash();

        info!(
            comparison_id = %comparison_id,
            left_doc = %request.left_doc_id,
            right_doc = %request.right_doc_id,
            strategy = %request.strategy,
            params_hash = %params_hash,
            left_chunks = request.left_chunks.len(),
            right_chunks = request.right_chunks.len(),
            "comparison start"
        );

        validate_side(&request.left_chunks, SourceSide::Left)?;
        validate_side(&request.right_chunks, SourceSide::Right)?;
        validate_disjoint_ids(&request.left_chunks, &request.right_chunks)?;
        let (left_vectors, right_vectors) = split_vectors(
            &request.vectors,
            &request.left_chunks,
            &request.right_chunks,
        )?;

        let left_fps: Vec<Fingerprint> = request
            .left_chunks
            .iter()
            .map(|c| fingerprint(c, self.config.shingle_size))
            .collect();
        let right_fps: Vec<Fingerprint> = request
            .right_chunks
            .iter()
            .map(|c| fingerprint(c, self.config.shingle_size))
            .collect();

        let pruned = prune(&left_fps, &right_fps, self.config.t_prune);
        debug!(pruned = pruned.len(), "pruning index emitted candidates");

        let candidates = refine(
            pruned,
            &request.left_chunks,
            &request.right_chunks,
            &left_fps,
            &right_fps,
            &left_vectors,
            &right_vectors,
            request.strategy,
            &self.config,
        )?;
        debug!(candidates = candidates.len(), "candidate set refined");

        let deadline = request.deadline.map(|budget| start + budget);
        let outcome = align(
            &request.left_chunks,
            &request.right_chunks,
            &candidates,
            &self.config,
            request.strategy,
            deadline,
        );
        let truncated = outcome.is_truncated();
        let path = outcome.into_path();

        let vectored: BTreeSet<ChunkId> = left_vectors
            .keys()
            .chain(right_vectors.keys())
            .cloned()
            .collect();
        let matches = classify(
            &path,
            &request.left_chunks,
            &request.right_chunks,
            &vectored,
            request.strategy,
            &self.config,
        );
        let totals = aggregate(&matches);

        let processing_time_ms = start.elapsed().as_millis();
        info!(
            comparison_id = %comparison_id,
            matches = matches.len(),
            compliant = totals.compliant_count,
            non_compliant = totals.non_compliant_count,
            truncated,
            processing_time_ms,
            "comparison complete"
        );

        Ok(ComparisonRun {
            comparison_id,
            left_doc_id: request.left_doc_id,
            right_doc_id: request.right_doc_id,
            strategy: request.strategy.to_string(),
            params_hash,
            matches,
            compliant_count: totals.compliant_count,
            non_compliant_count: totals.non_compliant_count,
            compliant_percentage: totals.compliant_percentage,
            non_compliant_percentage: totals.non_compliant_percentage,
            rounding_residual: totals.rounding_residual,
            total_chunks_left: request.left_chunks.len(),
            total_chunks_right: request.right_chunks.len(),
            processing_time_ms,
            truncated,
        })
    }
}

/// Validate one side's sequence: sides consistent, ids unique,
/// `(page_no, order_index)` strictly increasing.
fn validate_side(chunks: &[Chunk], side: SourceSide) -> Result<(), EngineError> {
    let mut seen: BTreeSet<&ChunkId> = BTreeSet::new();
    for (pos, chunk) in chunks.iter().enumerate() {
        if chunk.source_side != side {
            return Err(EngineError::InputMismatch(format!(
                "chunk {} at position {pos} carries side {} in the {side} list",
                chunk.id, chunk.source_side
            )));
        }
        if !seen.insert(&chunk.id) {
            return Err(EngineError::InputMismatch(format!(
                "duplicate chunk id {} in the {side} list",
                chunk.id
            )));
        }
        if pos > 0 {
            let prev = &chunks[pos - 1];
            if (chunk.page_no, chunk.order_index) <= (prev.page_no, prev.order_index) {
                return Err(EngineError::InputMismatch(format!(
                    "{side} list out of order at position {pos}: chunk {}",
                    chunk.id
                )));
            }
        }
    }
    Ok(())
}

/// Chunk ids must be globally unique across the pair: a shared id would
/// make one side shadow the other in downstream id lookups.
fn validate_disjoint_ids(left: &[Chunk], right: &[Chunk]) -> Result<(), EngineError> {
    let left_ids: BTreeSet<&ChunkId> = left.iter().map(|c| &c.id).collect();
    for chunk in right {
        if left_ids.contains(&chunk.id) {
            return Err(EngineError::InputMismatch(format!(
                "chunk id {} appears in both documents",
                chunk.id
            )));
        }
    }
    Ok(())
}

/// Split the vector list by side membership. Ids that exist in neither
/// chunk list are a validation failure.
#[allow(clippy::type_complexity)]
fn split_vectors(
    vectors: &[EmbeddingVector],
    left: &[Chunk],
    right: &[Chunk],
) -> Result<
    (
        BTreeMap<ChunkId, EmbeddingVector>,
        BTreeMap<ChunkId, EmbeddingVector>,
    ),
    EngineError,
> {
    let left_ids: BTreeSet<&ChunkId> = left.iter().map(|c| &c.id).collect();
    let right_ids: BTreeSet<&ChunkId> = right.iter().map(|c| &c.id).collect();

    let mut left_vectors = BTreeMap::new();
    let mut right_vectors = BTreeMap::new();
    for ev in vectors {
        if left_ids.contains(&ev.chunk_id) {
            left_vectors.insert(ev.chunk_id.clone(), ev.clone());
        } else if right_ids.contains(&ev.chunk_id) {
            right_vectors.insert(ev.chunk_id.clone(), ev.clone());
        } else {
            return Err(EngineError::InputMismatch(format!(
                "vector references unknown chunk id {}",
                ev.chunk_id
            )));
        }
    }
    Ok((left_vectors, right_vectors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::report::MatchType;

    fn doc(side: SourceSide, texts: &[&str]) -> Vec<Chunk> {
        let prefix = match side {
            SourceSide::Left => "l",
            SourceSide::Right => "r",
        };
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(format!("{prefix}{i}"), side, 1, i as u32, *t))
            .collect()
    }

    #[test]
    fn test_scenario_one_exact_one_insert() {
        let engine = ComparisonEngine::with_defaults();
        let request = CompareRequest::new(
            "doc-left",
            "doc-right",
            doc(SourceSide::Left, &["The quick brown fox"]),
            doc(
                SourceSide::Right,
                &["The quick brown fox", "jumps over the dog"],
            ),
            Strategy::Exact,
        );

        let run = engine.compare(request).unwrap();
        assert_eq!(run.matches.len(), 2);
        assert_eq!(run.matches[0].match_type, MatchType::Exact);
        assert_eq!(run.matches[1].match_type, MatchType::NoMatch);
        assert_eq!(run.matches[1].left_chunk_id, None);
        assert_eq!(run.compliant_percentage, 50.0);
        assert_eq!(run.total_chunks_left, 1);
        assert_eq!(run.total_chunks_right, 2);
        assert!(!run.truncated);
    }

    #[test]
    fn test_unknown_vector_id_aborts_before_alignment() {
        let engine = ComparisonEngine::with_defaults();
        let request = CompareRequest::new(
            "a",
            "b",
            doc(SourceSide::Left, &["text one"]),
            doc(SourceSide::Right, &["text one"]),
            Strategy::Semantic,
        )
        .with_vectors(vec![EmbeddingVector::new("ghost", vec![1.0], "m")]);

        let err = engine.compare(request).unwrap_err();
        assert!(matches!(err, EngineError::InputMismatch(_)));
    }

    #[test]
    fn test_out_of_order_chunks_rejected() {
        let engine = ComparisonEngine::with_defaults();
        let mut left = doc(SourceSide::Left, &["one", "two"]);
        left[1].order_index = 0; // Duplicate position.

        let request = CompareRequest::new(
            "a",
            "b",
            left,
            doc(SourceSide::Right, &["one"]),
            Strategy::Exact,
        );
        assert!(matches!(
            engine.compare(request),
            Err(EngineError::InputMismatch(_))
        ));
    }

    #[test]
    fn test_wrong_side_rejected() {
        let engine = ComparisonEngine::with_defaults();
        let request = CompareRequest::new(
            "a",
            "b",
            doc(SourceSide::Right, &["text"]),
            doc(SourceSide::Right, &["text"]),
            Strategy::Exact,
        );
        assert!(matches!(
            engine.compare(request),
            Err(EngineError::InputMismatch(_))
        ));
    }

    #[test]
    fn test_cross_side_duplicate_id_rejected() {
        // An id shared between the documents would shadow the left chunk
        // in downstream lookups; it must fail validation instead.
        let engine = ComparisonEngine::with_defaults();
        let left = vec![Chunk::new("shared", SourceSide::Left, 1, 0, "left text")];
        let right = vec![Chunk::new("shared", SourceSide::Right, 1, 0, "right text")];

        let request = CompareRequest::new("a", "b", left, right, Strategy::Exact);
        assert!(matches!(
            engine.compare(request),
            Err(EngineError::InputMismatch(_))
        ));
    }

    #[test]
    fn test_mismatched_vector_dimensions_rejected() {
        let engine = ComparisonEngine::with_defaults();
        let request = CompareRequest::new(
            "a",
            "b",
            doc(SourceSide::Left, &["alpha beta gamma delta"]),
            doc(SourceSide::Right, &["alpha beta gamma delta"]),
            Strategy::Semantic,
        )
        .with_vectors(vec![
            EmbeddingVector::new("l0", vec![1.0, 0.0], "m"),
            EmbeddingVector::new("r0", vec![1.0, 0.0, 0.0], "m"),
        ]);

        assert!(matches!(
            engine.compare(request),
            Err(EngineError::InputMismatch(_))
        ));
    }

    #[test]
    fn test_run_records_config_params_hash() {
        let engine = ComparisonEngine::with_defaults();
        let run = engine
            .compare(CompareRequest::new(
                "a",
                "b",
                doc(SourceSide::Left, &["same text"]),
                doc(SourceSide::Right, &["same text"]),
                Strategy::Exact,
            ))
            .unwrap();
        assert_eq!(run.params_hash, engine.config().params_hash());

        let mut tightened = CompareConfig::default();
        tightened.t_similar = 0.95;
        let other = ComparisonEngine::new(tightened)
            .unwrap()
            .compare(CompareRequest::new(
                "a",
                "b",
                doc(SourceSide::Left, &["same text"]),
                doc(SourceSide::Right, &["same text"]),
                Strategy::Exact,
            ))
            .unwrap();
        assert_ne!(run.params_hash, other.params_hash);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = CompareConfig::default();
        config.t_prune = 0.99;
        assert!(matches!(
            ComparisonEngine::new(config),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_both_sides_empty_yields_empty_run() {
        let engine = ComparisonEngine::with_defaults();
        let request = CompareRequest::new("a", "b", Vec::new(), Vec::new(), Strategy::Exact);
        let run = engine.compare(request).unwrap();
        assert!(run.matches.is_empty());
        assert_eq!(run.compliant_percentage, 0.0);
        assert_eq!(run.rounding_residual, 0.0);
    }

    #[test]
    fn test_fresh_comparison_id_per_run() {
        let engine = ComparisonEngine::with_defaults();
        let make = || {
            CompareRequest::new(
                "a",
                "b",
                doc(SourceSide::Left, &["same text"]),
                doc(SourceSide::Right, &["same text"]),
                Strategy::Exact,
            )
        };
        let first = engine.compare(make()).unwrap();
        let second = engine.compare(make()).unwrap();
        assert_ne!(first.comparison_id, second.comparison_id);
        // Everything except the identifier and timing is identical.
        assert_eq!(first.matches, second.matches);
    }

    #[test]
    fn test_vectorless_chunks_degrade_gracefully() {
        // Only one chunk has a vector; the run must still complete with
        // fingerprint similarity for the rest.
        let engine = ComparisonEngine::with_defaults();
        let request = CompareRequest::new(
            "a",
            "b",
            doc(SourceSide::Left, &["alpha beta gamma delta", "epsilon zeta eta theta"]),
            doc(SourceSide::Right, &["alpha beta gamma delta", "epsilon zeta eta theta"]),
            Strategy::Semantic,
        )
        .with_vectors(vec![EmbeddingVector::new("l0", vec![1.0, 0.0], "m")]);

        let run = engine.compare(request).unwrap();
        assert_eq!(run.compliant_count, 2);
    }
}
