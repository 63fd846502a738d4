//! Externally visible comparison records.
//!
//! The serde field names of these types are the wire contract that
//! downstream reporting and UI layers bind to verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::chunk::ChunkId;

/// Classification of one aligned (or unaligned) chunk pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Textually identical or above the exact threshold.
    Exact,
    /// Minor edits; similarity above the similar threshold.
    Similar,
    /// Related content rewritten; supported by vector evidence.
    Paraphrase,
    /// No counterpart on the other side, or similarity below every floor.
    NoMatch,
}

impl MatchType {
    /// Whether this type counts toward the compliant total.
    pub fn is_compliant(&self) -> bool {
        matches!(self, Self::Exact | Self::Similar)
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Similar => write!(f, "similar"),
            Self::Paraphrase => write!(f, "paraphrase"),
            Self::NoMatch => write!(f, "no_match"),
        }
    }
}

/// Kind of a token-level edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEditKind {
    /// Token present on both sides.
    Equal,
    /// Token only on the right side.
    Insert,
    /// Token only on the left side.
    Delete,
}

/// One token-level edit operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenOp {
    /// What happened to the token.
    pub kind: TokenEditKind,
    /// The token text.
    pub text: String,
}

/// A minimal token-level edit script between two chunk texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditScript {
    /// Edit operations in left-to-right order.
    pub ops: Vec<TokenOp>,
    /// True when very long chunks were diffed on a truncated window.
    pub partial: bool,
}

impl EditScript {
    /// Render the script as inline markup with `<del>`/`<ins>` tags.
    pub fn render_markup(&self) -> String {
        let mut out = String::new();
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            match op.kind {
                TokenEditKind::Equal => out.push_str(&op.text),
                TokenEditKind::Delete => {
                    out.push_str("<del>");
                    out.push_str(&op.text);
                    out.push_str("</del>");
                }
                TokenEditKind::Insert => {
                    out.push_str("<ins>");
                    out.push_str(&op.text);
                    out.push_str("</ins>");
                }
            }
        }
        if self.partial {
            out.push_str(" …");
        }
        out
    }

    /// Number of non-equal ops.
    pub fn change_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| op.kind != TokenEditKind::Equal)
            .count()
    }
}

/// The final externally visible record for one alignment outcome.
///
/// Created once per comparison run, immutable, never updated; a re-run
/// produces a fresh set under a new comparison identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMatch {
    /// Left chunk, absent for inserted content.
    pub left_chunk_id: Option<ChunkId>,
    /// Right chunk, absent for deleted content.
    pub right_chunk_id: Option<ChunkId>,
    /// Classification outcome.
    pub match_type: MatchType,
    /// Similarity in [0, 1]; 0.0 for one-sided records.
    pub similarity_score: f64,
    /// Left chunk text, when present.
    pub left_text: Option<String>,
    /// Right chunk text, when present.
    pub right_text: Option<String>,
    /// Token-level edit script for related-but-not-identical pairs.
    pub diff_ops: Option<EditScript>,
    /// Inline `<del>`/`<ins>` rendering of `diff_ops`.
    pub diff_markup: Option<String>,
}

/// One complete comparison of a left document against a right document.
///
/// Owned exclusively by the engine for the duration of one invocation;
/// no shared mutable state exists across concurrent runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRun {
    /// Unique identifier of this run.
    pub comparison_id: String,
    /// Identifier of the left (baseline) document.
    pub left_doc_id: String,
    /// Identifier of the right (revised) document.
    pub right_doc_id: String,
    /// Strategy selector the run was executed with.
    pub strategy: String,
    /// Canonical digest of the configuration parameters the run executed
    /// under; ties a recorded run back to its exact threshold ladder.
    pub params_hash: String,
    /// Ordered match records, one per alignment op.
    pub matches: Vec<ChunkMatch>,
    /// Number of exact + similar records.
    pub compliant_count: usize,
    /// Number of paraphrase + no_match records.
    pub non_compliant_count: usize,
    /// Compliant share of total matches, in percent.
    pub compliant_percentage: f64,
    /// Non-compliant share of total matches, in percent.
    pub non_compliant_percentage: f64,
    /// `100 - (compliant_percentage + non_compliant_percentage)`.
    /// Floating rounding is reported here, never silently dropped.
    pub rounding_residual: f64,
    /// Chunk count of the left document.
    pub total_chunks_left: usize,
    /// Chunk count of the right document.
    pub total_chunks_right: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub processing_time_ms: u128,
    /// True when the alignment was cut short by the deadline.
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_type_compliance() {
        assert!(MatchType::Exact.is_compliant());
        assert!(MatchType::Similar.is_compliant());
        assert!(!MatchType::Paraphrase.is_compliant());
        assert!(!MatchType::NoMatch.is_compliant());
    }

    #[test]
    fn test_match_type_serializes_snake_case() {
        let json = serde_json::to_string(&MatchType::NoMatch).unwrap();
        assert_eq!(json, "\"no_match\"");
    }

    #[test]
    fn test_render_markup() {
        let script = EditScript {
            ops: vec![
                TokenOp {
                    kind: TokenEditKind::Equal,
                    text: "the".to_string(),
                },
                TokenOp {
                    kind: TokenEditKind::Delete,
                    text: "quick".to_string(),
                },
                TokenOp {
                    kind: TokenEditKind::Insert,
                    text: "slow".to_string(),
                },
            ],
            partial: false,
        };

        assert_eq!(script.render_markup(), "the <del>quick</del> <ins>slow</ins>");
        assert_eq!(script.change_count(), 2);
    }
}
