//! Chunk types for the comparison kernel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a chunk within a comparison.
///
/// Wraps the upstream normalizer's stable identifier and implements `Ord`
/// for deterministic ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(String);

impl ChunkId {
    /// Create a new ChunkId from any string-like identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChunkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChunkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Which document a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSide {
    /// The baseline (reference) document.
    Left,
    /// The revised document under audit.
    Right,
}

impl SourceSide {
    /// Parse side from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

impl fmt::Display for SourceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// A normalized text unit produced by the upstream normalizer.
///
/// Immutable once produced; `order_index` defines the intra-document
/// sequence, which is the sole ordering the alignment kernel respects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable chunk identifier.
    pub id: ChunkId,
    /// Which document this chunk belongs to.
    pub source_side: SourceSide,
    /// Page number in the source document (1-based).
    pub page_no: u32,
    /// Position within the document sequence (0-based).
    pub order_index: u32,
    /// Normalized text content.
    pub text: String,
    /// Length of the text in bytes.
    pub byte_length: usize,
}

impl Chunk {
    /// Create a new chunk. `byte_length` is derived from `text`.
    pub fn new(
        id: impl Into<ChunkId>,
        source_side: SourceSide,
        page_no: u32,
        order_index: u32,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let byte_length = text.len();
        Self {
            id: id.into(),
            source_side,
            page_no,
            order_index,
            text,
            byte_length,
        }
    }

    /// Number of whitespace-separated tokens in the text.
    pub fn token_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Whether the chunk carries no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.text.split_whitespace().next().is_none()
    }
}

// Ord on (order_index, id) so chunk sequences sort deterministically.
impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Chunk {}

impl PartialOrd for Chunk {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Chunk {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order_index
            .cmp(&other.order_index)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_ordering() {
        let a = ChunkId::new("chunk-001");
        let b = ChunkId::new("chunk-002");
        assert!(a < b);
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!(SourceSide::from_str("left"), Some(SourceSide::Left));
        assert_eq!(SourceSide::from_str("RIGHT"), Some(SourceSide::Right));
        assert_eq!(SourceSide::from_str("middle"), None);
    }

    #[test]
    fn test_token_count() {
        let chunk = Chunk::new("c1", SourceSide::Left, 1, 0, "the quick brown fox");
        assert_eq!(chunk.token_count(), 4);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_empty_chunk() {
        let chunk = Chunk::new("c1", SourceSide::Left, 1, 0, "   ");
        assert_eq!(chunk.token_count(), 0);
        assert!(chunk.is_empty());
    }

    #[test]
    fn test_chunk_ordering_by_order_index() {
        let first = Chunk::new("z", SourceSide::Left, 1, 0, "a");
        let second = Chunk::new("a", SourceSide::Left, 1, 1, "b");
        assert!(first < second);
    }
}
