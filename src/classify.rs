//! Classifier: threshold ladder over alignment outcomes.
//!
//! Maps each alignment op to a labeled match record, evaluated in fixed
//! priority order: textual equality or `t_exact` first, then `t_similar`,
//! then the `paraphrase` floor (only with vector evidence), else
//! `no_match`. One-sided ops always classify as `no_match` with only one
//! side populated.

use std::collections::{BTreeSet, HashMap};

use crate::config::{CompareConfig, Strategy};
use crate::token_diff::diff_tokens;
use crate::types::alignment::{AlignmentOp, AlignmentPath};
use crate::types::chunk::{Chunk, ChunkId};
use crate::types::report::{ChunkMatch, MatchType};

/// Aggregate compliance totals over a match list.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceTotals {
    /// exact + similar records.
    pub compliant_count: usize,
    /// paraphrase + no_match records.
    pub non_compliant_count: usize,
    /// Compliant share in percent.
    pub compliant_percentage: f64,
    /// Non-compliant share in percent.
    pub non_compliant_percentage: f64,
    /// `100 - (compliant + non_compliant)` percent; floating rounding is
    /// surfaced here rather than silently dropped.
    pub rounding_residual: f64,
}

/// Classify every op of an alignment path into a match record.
///
/// `vectored` holds the ids of chunks that carried an embedding vector;
/// a pair has vector evidence only when the strategy uses vectors and
/// both of its chunks are in the set.
pub fn classify(
    path: &AlignmentPath,
    left_chunks: &[Chunk],
    right_chunks: &[Chunk],
    vectored: &BTreeSet<ChunkId>,
    strategy: Strategy,
    config: &CompareConfig,
) -> Vec<ChunkMatch> {
    let by_id: HashMap<&ChunkId, &Chunk> = left_chunks
        .iter()
        .chain(right_chunks.iter())
        .map(|c| (&c.id, c))
        .collect();

    path.ops
        .iter()
        .map(|op| match op {
            AlignmentOp::Match {
                left_id,
                right_id,
                score,
            } => {
                let left = by_id[left_id];
                let right = by_id[right_id];
                classify_pair(left, right, *score, vectored, strategy, config)
            }
            AlignmentOp::Insert { right_id } => {
                let right = by_id[right_id];
                ChunkMatch {
                    left_chunk_id: None,
                    right_chunk_id: Some(right.id.clone()),
                    match_type: MatchType::NoMatch,
                    similarity_score: 0.0,
                    left_text: None,
                    right_text: Some(right.text.clone()),
                    diff_ops: None,
                    diff_markup: None,
                }
            }
            AlignmentOp::Delete { left_id } => {
                let left = by_id[left_id];
                ChunkMatch {
                    left_chunk_id: Some(left.id.clone()),
                    right_chunk_id: None,
                    match_type: MatchType::NoMatch,
                    similarity_score: 0.0,
                    left_text: Some(left.text.clone()),
                    right_text: None,
                    diff_ops: None,
                    diff_markup: None,
                }
            }
        })
        .collect()
}

fn classify_pair(
    left: &Chunk,
    right: &Chunk,
    score: f64,
    vectored: &BTreeSet<ChunkId>,
    strategy: Strategy,
    config: &CompareConfig,
) -> ChunkMatch {
    let textually_equal = left.text.trim() == right.text.trim();
    let similarity_score = if textually_equal { 1.0 } else { score };

    let vector_evidence = strategy.uses_vectors()
        && vectored.contains(&left.id)
        && vectored.contains(&right.id);

    let match_type = if textually_equal || similarity_score >= config.t_exact {
        MatchType::Exact
    } else if similarity_score >= config.t_similar {
        MatchType::Similar
    } else if vector_evidence && similarity_score >= config.t_paraphrase {
        MatchType::Paraphrase
    } else {
        MatchType::NoMatch
    };

    // Localize edits for pairs judged related but not identical.
    let diff_ops = match match_type {
        MatchType::Similar | MatchType::Paraphrase => {
            Some(diff_tokens(&left.text, &right.text, config.max_diff_tokens))
        }
        MatchType::Exact | MatchType::NoMatch => None,
    };
    let diff_markup = diff_ops.as_ref().map(|script| script.render_markup());

    ChunkMatch {
        left_chunk_id: Some(left.id.clone()),
        right_chunk_id: Some(right.id.clone()),
        match_type,
        similarity_score,
        left_text: Some(left.text.clone()),
        right_text: Some(right.text.clone()),
        diff_ops,
        diff_markup,
    }
}

/// Aggregate counts and percentages over classified matches.
///
/// Percentages are over the total match record count; for an empty list
/// everything is zero.
pub fn aggregate(matches: &[ChunkMatch]) -> ComplianceTotals {
    let compliant_count = matches
        .iter()
        .filter(|m| m.match_type.is_compliant())
        .count();
    let non_compliant_count = matches.len() - compliant_count;

    let total = matches.len() as f64;
    let (compliant_percentage, non_compliant_percentage) = if matches.is_empty() {
        (0.0, 0.0)
    } else {
        (
            compliant_count as f64 / total * 100.0,
            non_compliant_count as f64 / total * 100.0,
        )
    };
    let rounding_residual = if matches.is_empty() {
        0.0
    } else {
        100.0 - (compliant_percentage + non_compliant_percentage)
    };

    ComplianceTotals {
        compliant_count,
        non_compliant_count,
        compliant_percentage,
        non_compliant_percentage,
        rounding_residual,
    }
}
