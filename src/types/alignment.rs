//! Alignment path types.
//!
//! An alignment is an optimal, order-preserving correspondence between two
//! chunk sequences, permitting insertions and deletions. The left ids of
//! Match/Delete ops reproduce the left document's order exactly, and
//! likewise for right ids: this monotonicity is what makes the path a
//! valid edit script rather than an arbitrary matching.

use serde::{Deserialize, Serialize};

use crate::types::chunk::ChunkId;

/// One step of an alignment path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AlignmentOp {
    /// A left chunk paired with a right chunk at the given similarity.
    Match {
        /// Left-side chunk.
        left_id: ChunkId,
        /// Right-side chunk.
        right_id: ChunkId,
        /// Pair similarity in [0, 1].
        score: f64,
    },
    /// A right chunk with no left counterpart (inserted content).
    Insert {
        /// Right-side chunk.
        right_id: ChunkId,
    },
    /// A left chunk with no right counterpart (deleted content).
    Delete {
        /// Left-side chunk.
        left_id: ChunkId,
    },
}

impl AlignmentOp {
    /// Left chunk id, if this op consumes one.
    pub fn left_id(&self) -> Option<&ChunkId> {
        match self {
            Self::Match { left_id, .. } | Self::Delete { left_id } => Some(left_id),
            Self::Insert { .. } => None,
        }
    }

    /// Right chunk id, if this op consumes one.
    pub fn right_id(&self) -> Option<&ChunkId> {
        match self {
            Self::Match { right_id, .. } | Self::Insert { right_id } => Some(right_id),
            Self::Delete { .. } => None,
        }
    }
}

/// An ordered sequence of alignment ops covering both documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentPath {
    /// The ops, in path order.
    pub ops: Vec<AlignmentOp>,
}

impl AlignmentPath {
    /// Create a path from ops.
    pub fn new(ops: Vec<AlignmentOp>) -> Self {
        Self { ops }
    }

    /// Left chunk ids in path order (Match and Delete ops).
    pub fn left_ids(&self) -> Vec<&ChunkId> {
        self.ops.iter().filter_map(|op| op.left_id()).collect()
    }

    /// Right chunk ids in path order (Match and Insert ops).
    pub fn right_ids(&self) -> Vec<&ChunkId> {
        self.ops.iter().filter_map(|op| op.right_id()).collect()
    }

    /// Number of Match ops in the path.
    pub fn match_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, AlignmentOp::Match { .. }))
            .count()
    }
}

/// How the alignment kernel produced its path.
///
/// The banding fallback is a tagged result rather than an exception: the
/// control flow is a pure function of input size and anchor quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlignmentOutcome {
    /// Optimal path found within the diagonal band.
    Banded(AlignmentPath),
    /// Anchors fell outside the band; full-width DP was run instead.
    Escalated(AlignmentPath),
    /// Deadline expired; positional fallback path, not optimal.
    Truncated(AlignmentPath),
}

impl AlignmentOutcome {
    /// The path regardless of how it was obtained.
    pub fn path(&self) -> &AlignmentPath {
        match self {
            Self::Banded(p) | Self::Escalated(p) | Self::Truncated(p) => p,
        }
    }

    /// Consume the outcome, returning the path.
    pub fn into_path(self) -> AlignmentPath {
        match self {
            Self::Banded(p) | Self::Escalated(p) | Self::Truncated(p) => p,
        }
    }

    /// Whether the path is a deadline-truncated fallback.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_projections() {
        let path = AlignmentPath::new(vec![
            AlignmentOp::Match {
                left_id: ChunkId::new("l0"),
                right_id: ChunkId::new("r0"),
                score: 1.0,
            },
            AlignmentOp::Delete {
                left_id: ChunkId::new("l1"),
            },
            AlignmentOp::Insert {
                right_id: ChunkId::new("r1"),
            },
        ]);

        let left: Vec<&str> = path.left_ids().iter().map(|id| id.as_str()).collect();
        let right: Vec<&str> = path.right_ids().iter().map(|id| id.as_str()).collect();
        assert_eq!(left, vec!["l0", "l1"]);
        assert_eq!(right, vec!["r0", "r1"]);
        assert_eq!(path.match_count(), 1);
    }

    #[test]
    fn test_outcome_unwraps_path() {
        let path = AlignmentPath::new(vec![]);
        let outcome = AlignmentOutcome::Banded(path.clone());
        assert_eq!(outcome.path(), &path);
        assert!(!outcome.is_truncated());
        assert!(AlignmentOutcome::Truncated(path).is_truncated());
    }
}
