//! # drift-kernel
//!
//! Deterministic comparison of paired document revisions.
//!
//! The comparison kernel answers one question:
//!
//! > Given two ordered sequences of normalized text chunks, how do the
//! > documents differ — and how confident are we in each difference?
//!
//! ## Core Contract
//!
//! 1. Reduce comparison cost below quadratic with fingerprint pruning
//! 2. Produce a verified, order-preserving alignment of the two sequences
//! 3. Classify every chunk into `exact | similar | paraphrase | no_match`
//!    with a similarity score and aggregate compliance percentages
//!
//! ## Architecture
//!
//! ```text
//! Chunks → Fingerprinter → Pruning Index → Candidate Generator
//!            → Alignment Kernel → Token Differ → Classifier → ComparisonRun
//! ```
//!
//! All stages are pure transformations over immutable input sequences;
//! per-run indexes are built once and borrowed into each stage. Runs are
//! independent and may execute fully in parallel.
//!
//! ## Determinism Guarantees
//!
//! - Same chunks + same vectors + same config → byte-identical matches
//! - Fingerprints depend only on chunk text, never on side or position
//! - Alignment traceback ties break Match > Delete > Insert

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod align;
pub mod candidates;
pub mod canonical;
pub mod classify;
pub mod config;
pub mod engine;
pub mod prune;
pub mod sketch;
pub mod token_diff;
pub mod types;

// Re-exports
pub use align::align;
pub use candidates::{cosine_similarity, refine, VectorIndex, VectorIndexError};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use classify::{aggregate, classify, ComplianceTotals};
pub use config::{CompareConfig, ConfigError, Strategy};
pub use engine::{CompareRequest, ComparisonEngine, EngineError};
pub use prune::{length_band, prune};
pub use sketch::fingerprint;
pub use token_diff::diff_tokens;
pub use types::{
    AlignmentOp, AlignmentOutcome, AlignmentPath, CandidatePair, Chunk, ChunkId, ChunkMatch,
    ComparisonRun, EditScript, EmbeddingVector, Fingerprint, MatchType, SourceSide, TokenEditKind,
    TokenOp, SKETCH_BITS,
};

/// Schema version for all comparison kernel types.
/// Increment on breaking changes to any schema type.
pub const COMPARISON_SCHEMA_VERSION: &str = "1.0.0";

/// Default configuration version identifier.
pub const DEFAULT_CONFIG_VERSION: &str = "compare_config_v1";
