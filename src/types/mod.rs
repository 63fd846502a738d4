//! Core types for the comparison kernel.

pub mod alignment;
pub mod candidate;
pub mod chunk;
pub mod fingerprint;
pub mod report;

pub use alignment::{AlignmentOp, AlignmentOutcome, AlignmentPath};
pub use candidate::{CandidatePair, EmbeddingVector};
pub use chunk::{Chunk, ChunkId, SourceSide};
pub use fingerprint::{Fingerprint, SKETCH_BITS};
pub use report::{ChunkMatch, ComparisonRun, EditScript, MatchType, TokenEditKind, TokenOp};
