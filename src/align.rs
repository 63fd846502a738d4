//! Alignment kernel: banded global alignment with affine gap penalties.
//!
//! Runs Needleman–Wunsch/Gotoh three-state dynamic programming over the
//! two ordered chunk sequences. Match scores come from the candidate set;
//! cells with no candidate pair default to the configured base similarity,
//! so the scoring matrix stays sparse and no dense similarity computation
//! is needed.
//!
//! The DP frontier is restricted to a diagonal band around the identity
//! alignment. A sampled-anchor pre-check escalates to full-width DP when
//! high-similarity pairs fall outside the band, which keeps the common
//! mostly-sequential case near-linear while remaining correct for heavily
//! reordered documents. Traceback ties break deterministically: Match,
//! then Delete, then Insert.

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use crate::config::{CompareConfig, Strategy};
use crate::types::alignment::{AlignmentOp, AlignmentOutcome, AlignmentPath};
use crate::types::candidate::CandidatePair;
use crate::types::chunk::{Chunk, ChunkId};

const NEG: f32 = f32::NEG_INFINITY;

/// DP matrix selector used in traceback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Diagonal state: left chunk paired with right chunk.
    Matched,
    /// Vertical state: left chunk deleted.
    Deleted,
    /// Horizontal state: right chunk inserted.
    Inserted,
}

/// Align two ordered chunk sequences into an edit path.
///
/// `deadline`, when given, bounds the DP: on expiry the kernel returns the
/// positional fallback path tagged [`AlignmentOutcome::Truncated`] rather
/// than blocking a shared worker pool.
pub fn align(
    left: &[Chunk],
    right: &[Chunk],
    candidates: &[CandidatePair],
    config: &CompareConfig,
    strategy: Strategy,
    deadline: Option<Instant>,
) -> AlignmentOutcome {
    let n = left.len();
    let m = right.len();

    // Degenerate sides are the all-Insert / all-Delete edge case, not an
    // error.
    if n == 0 || m == 0 {
        let mut ops = Vec::with_capacity(n + m);
        ops.extend(left.iter().map(|c| AlignmentOp::Delete {
            left_id: c.id.clone(),
        }));
        ops.extend(right.iter().map(|c| AlignmentOp::Insert {
            right_id: c.id.clone(),
        }));
        return AlignmentOutcome::Banded(AlignmentPath::new(ops));
    }

    let scores = ScoreLookup::new(left, right, candidates);

    let band = band_half_width(n, m, config, strategy);
    let escalate = !anchors_fit_band(&scores, n, m, band, config.t_anchor);
    let full_width = escalate || m.div_ceil(n) + 1 > band;
    debug!(
        n,
        m,
        band,
        full_width,
        "alignment kernel start"
    );

    match run_gotoh(left, right, &scores, config, band, full_width, deadline) {
        Some(path) => {
            if full_width {
                AlignmentOutcome::Escalated(path)
            } else {
                AlignmentOutcome::Banded(path)
            }
        }
        None => {
            debug!(n, m, "deadline expired, returning positional fallback");
            AlignmentOutcome::Truncated(positional_fallback(left, right, &scores))
        }
    }
}

/// Sparse similarity lookup over candidate pairs, keyed by position.
struct ScoreLookup {
    cells: HashMap<(usize, usize), f64>,
}

impl ScoreLookup {
    fn new(left: &[Chunk], right: &[Chunk], candidates: &[CandidatePair]) -> Self {
        let left_pos: HashMap<&ChunkId, usize> =
            left.iter().enumerate().map(|(i, c)| (&c.id, i)).collect();
        let right_pos: HashMap<&ChunkId, usize> =
            right.iter().enumerate().map(|(j, c)| (&c.id, j)).collect();

        let mut cells = HashMap::with_capacity(candidates.len());
        for pair in candidates {
            if let (Some(&i), Some(&j)) = (
                left_pos.get(&pair.left_chunk_id),
                right_pos.get(&pair.right_chunk_id),
            ) {
                let entry = cells.entry((i, j)).or_insert(pair.similarity);
                if pair.similarity > *entry {
                    *entry = pair.similarity;
                }
            }
        }
        Self { cells }
    }

    fn similarity(&self, i: usize, j: usize, base: f64) -> f64 {
        self.cells.get(&(i, j)).copied().unwrap_or(base)
    }
}

/// Band half-width for the DP frontier.
fn band_half_width(n: usize, m: usize, config: &CompareConfig, strategy: Strategy) -> usize {
    let scaled =
        (config.band_fraction * n.max(m) as f64 * strategy.band_width_factor()).ceil() as usize;
    scaled.max(config.band_min_width)
}

/// Sampled-anchor pre-check: do the high-similarity candidate cells sit
/// inside the diagonal band? Returns false when fewer than half do,
/// signalling heavy reordering the band would misalign.
fn anchors_fit_band(
    scores: &ScoreLookup,
    n: usize,
    m: usize,
    band: usize,
    t_anchor: f64,
) -> bool {
    let mut anchors = 0usize;
    let mut inside = 0usize;
    for (&(i, j), &sim) in &scores.cells {
        if sim < t_anchor {
            continue;
        }
        anchors += 1;
        let center = i * m / n;
        if j.abs_diff(center) <= band {
            inside += 1;
        }
    }
    anchors == 0 || inside * 2 >= anchors
}

/// Three-state affine-gap DP with traceback.
///
/// Returns `None` when the deadline expires mid-computation.
#[allow(clippy::too_many_arguments)]
fn run_gotoh(
    left: &[Chunk],
    right: &[Chunk],
    scores: &ScoreLookup,
    config: &CompareConfig,
    band: usize,
    full_width: bool,
    deadline: Option<Instant>,
) -> Option<AlignmentPath> {
    let n = left.len();
    let m = right.len();
    let width = m + 1;
    let open = config.gap_open as f32;
    let extend = config.gap_extend as f32;

    let size = (n + 1) * width;
    let mut matched = vec![NEG; size];
    let mut deleted = vec![NEG; size];
    let mut inserted = vec![NEG; size];
    // Traceback: predecessor state per cell per matrix.
    let mut from_matched = vec![State::Matched; size];
    let mut from_deleted = vec![State::Matched; size];
    let mut from_inserted = vec![State::Matched; size];

    let row_range = |i: usize| -> (usize, usize) {
        if full_width {
            (0, m)
        } else {
            let center = i * m / n;
            (center.saturating_sub(band), (center + band).min(m))
        }
    };

    matched[0] = 0.0;
    let (_, hi0) = row_range(0);
    for j in 1..=hi0 {
        inserted[j] = -(open + (j as f32 - 1.0) * extend);
        from_inserted[j] = if j == 1 { State::Matched } else { State::Inserted };
    }

    for i in 1..=n {
        if let Some(limit) = deadline {
            if Instant::now() >= limit {
                return None;
            }
        }

        let (lo, hi) = row_range(i);
        if lo == 0 {
            let idx = i * width;
            deleted[idx] = -(open + (i as f32 - 1.0) * extend);
            from_deleted[idx] = if i == 1 { State::Matched } else { State::Deleted };
        }

        for j in lo.max(1)..=hi {
            let idx = i * width + j;
            let diag = (i - 1) * width + (j - 1);
            let up = (i - 1) * width + j;
            let back = i * width + (j - 1);

            // Diagonal: pair left[i-1] with right[j-1].
            let sim = scores.similarity(i - 1, j - 1, config.base_similarity);
            let pair_score = (2.0 * sim - 1.0) as f32;
            let (best, src) =
                best_of(matched[diag], deleted[diag], inserted[diag]);
            if best > NEG {
                matched[idx] = best + pair_score;
                from_matched[idx] = src;
            }

            // Vertical: delete left[i-1].
            let (best, src) = best_of(
                matched[up] - open,
                deleted[up] - extend,
                inserted[up] - open,
            );
            if best > NEG {
                deleted[idx] = best;
                from_deleted[idx] = src;
            }

            // Horizontal: insert right[j-1].
            let (best, src) = best_of(
                matched[back] - open,
                deleted[back] - open,
                inserted[back] - extend,
            );
            if best > NEG {
                inserted[idx] = best;
                from_inserted[idx] = src;
            }
        }
    }

    // Traceback from (n, m), preferring Match over Delete over Insert.
    let end = n * width + m;
    let (_, mut state) = best_of(matched[end], deleted[end], inserted[end]);

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        let idx = i * width + j;
        // Boundary cells admit only one direction.
        if i == 0 {
            state = State::Inserted;
        } else if j == 0 {
            state = State::Deleted;
        }
        match state {
            State::Matched => {
                let sim = scores.similarity(i - 1, j - 1, config.base_similarity);
                ops.push(AlignmentOp::Match {
                    left_id: left[i - 1].id.clone(),
                    right_id: right[j - 1].id.clone(),
                    score: sim,
                });
                state = from_matched[idx];
                i -= 1;
                j -= 1;
            }
            State::Deleted => {
                ops.push(AlignmentOp::Delete {
                    left_id: left[i - 1].id.clone(),
                });
                state = from_deleted[idx];
                i -= 1;
            }
            State::Inserted => {
                ops.push(AlignmentOp::Insert {
                    right_id: right[j - 1].id.clone(),
                });
                state = from_inserted[idx];
                j -= 1;
            }
        }
    }
    ops.reverse();
    Some(AlignmentPath::new(ops))
}

/// Pick the best of the three states with the deterministic tie order
/// Match > Delete > Insert.
fn best_of(matched: f32, deleted: f32, inserted: f32) -> (f32, State) {
    let mut best = (matched, State::Matched);
    if deleted > best.0 {
        best = (deleted, State::Deleted);
    }
    if inserted > best.0 {
        best = (inserted, State::Inserted);
    }
    best
}

/// O(n) positional pairing used when the deadline expires: pair chunks by
/// index, emit the remainder as one-sided ops. Preserves completeness and
/// order, not optimality.
fn positional_fallback(left: &[Chunk], right: &[Chunk], scores: &ScoreLookup) -> AlignmentPath {
    let shared = left.len().min(right.len());
    let mut ops = Vec::with_capacity(left.len().max(right.len()));
    for i in 0..shared {
        ops.push(AlignmentOp::Match {
            left_id: left[i].id.clone(),
            right_id: right[i].id.clone(),
            score: scores.similarity(i, i, 0.0),
        });
    }
    for chunk in &left[shared..] {
        ops.push(AlignmentOp::Delete {
            left_id: chunk.id.clone(),
        });
    }
    for chunk in &right[shared..] {
        ops.push(AlignmentOp::Insert {
            right_id: chunk.id.clone(),
        });
    }
    AlignmentPath::new(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::prune::prune;
    use crate::sketch::fingerprint;
    use crate::types::chunk::SourceSide;

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

    fn candidates(left: &[Chunk], right: &[Chunk]) -> Vec<CandidatePair> {
        let lf: Vec<_> = left.iter().map(|c| fingerprint(c, 3)).collect();
        let rf: Vec<_> = right.iter().map(|c| fingerprint(c, 3)).collect();
        prune(&lf, &rf, 0.5)
    }

    fn ids(path: &AlignmentPath) -> Vec<String> {
        path.ops
            .iter()
            .map(|op| match op {
                AlignmentOp::Match {
                    left_id, right_id, ..
                } => format!("M:{left_id}:{right_id}"),
                AlignmentOp::Delete { left_id } => format!("D:{left_id}"),
                AlignmentOp::Insert { right_id } => format!("I:{right_id}"),
            })
            .collect()
    }

    #[test]
    fn test_empty_left_is_all_inserts() {
        let left: Vec<Chunk> = Vec::new();
        let right = doc(SourceSide::Right, &["a b c", "d e f"]);
        let outcome = align(
            &left,
            &right,
            &[],
            &CompareConfig::default(),
            Strategy::Exact,
            None,
        );
        assert_eq!(
            ids(outcome.path()),
            vec!["I:r0".to_string(), "I:r1".to_string()]
        );
    }

    #[test]
    fn test_empty_right_is_all_deletes() {
        let left = doc(SourceSide::Left, &["a b c"]);
        let outcome = align(
            &left,
            &[],
            &[],
            &CompareConfig::default(),
            Strategy::Exact,
            None,
        );
        assert_eq!(ids(outcome.path()), vec!["D:l0".to_string()]);
    }

    #[test]
    fn test_identical_documents_all_match() {
        let texts = [
            "the first clause of the agreement",
            "the second clause covering termination",
            "the third clause covering liability",
        ];
        let left = doc(SourceSide::Left, &texts);
        let right = doc(SourceSide::Right, &texts);
        let cands = candidates(&left, &right);

        let outcome = align(
            &left,
            &right,
            &cands,
            &CompareConfig::default(),
            Strategy::Exact,
            None,
        );

        let path = outcome.path();
        assert_eq!(path.ops.len(), 3);
        for op in &path.ops {
            match op {
                AlignmentOp::Match { score, .. } => assert_eq!(*score, 1.0),
                other => panic!("expected all matches, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_insertion_detected_in_middle() {
        let left = doc(
            SourceSide::Left,
            &[
                "clause one on payment terms and schedules",
                "clause two on delivery windows and carriers",
            ],
        );
        let right = doc(
            SourceSide::Right,
            &[
                "clause one on payment terms and schedules",
                "a newly inserted indemnification clause appears here",
                "clause two on delivery windows and carriers",
            ],
        );
        let cands = candidates(&left, &right);

        let outcome = align(
            &left,
            &right,
            &cands,
            &CompareConfig::default(),
            Strategy::Exact,
            None,
        );

        assert_eq!(
            ids(outcome.path()),
            vec![
                "M:l0:r0".to_string(),
                "I:r1".to_string(),
                "M:l1:r2".to_string(),
            ]
        );
    }

    #[test]
    fn test_order_preservation_and_completeness() {
        let left = doc(
            SourceSide::Left,
            &["alpha beta gamma", "delta epsilon zeta", "eta theta iota"],
        );
        let right = doc(
            SourceSide::Right,
            &["delta epsilon zeta", "eta theta iota", "kappa lambda mu"],
        );
        let cands = candidates(&left, &right);
        let outcome = align(
            &left,
            &right,
            &cands,
            &CompareConfig::default(),
            Strategy::Exact,
            None,
        );
        let path = outcome.path();

        let left_seq: Vec<&str> = path.left_ids().iter().map(|id| id.as_str()).collect();
        let right_seq: Vec<&str> = path.right_ids().iter().map(|id| id.as_str()).collect();
        assert_eq!(left_seq, vec!["l0", "l1", "l2"]);
        assert_eq!(right_seq, vec!["r0", "r1", "r2"]);
    }

    #[test]
    fn test_determinism_across_runs() {
        let left = doc(
            SourceSide::Left,
            &["one two three", "four five six", "seven eight nine"],
        );
        let right = doc(
            SourceSide::Right,
            &["one two three", "seven eight nine", "four five six"],
        );
        let cands = candidates(&left, &right);
        let config = CompareConfig::default();

        let first = align(&left, &right, &cands, &config, Strategy::Exact, None);
        for _ in 0..20 {
            let again = align(&left, &right, &cands, &config, Strategy::Exact, None);
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_expired_deadline_returns_truncated_fallback() {
        let left = doc(SourceSide::Left, &["a b c", "d e f", "g h i"]);
        let right = doc(SourceSide::Right, &["a b c", "d e f"]);
        let cands = candidates(&left, &right);

        let expired = Instant::now() - Duration::from_millis(1);
        let outcome = align(
            &left,
            &right,
            &cands,
            &CompareConfig::default(),
            Strategy::Exact,
            Some(expired),
        );

        assert!(outcome.is_truncated());
        let path = outcome.path();
        // Positional fallback still covers every chunk exactly once.
        assert_eq!(path.left_ids().len(), 3);
        assert_eq!(path.right_ids().len(), 2);
    }

    #[test]
    fn test_heavy_reordering_escalates_to_full_width() {
        // Build documents long enough that the band is narrow relative to
        // the reordering distance, with exact matches far off-diagonal.
        let filler_left: Vec<String> = (0..200)
            .map(|i| format!("left filler clause number {i} with unique body {i}"))
            .collect();
        let filler_right: Vec<String> = (0..200)
            .map(|i| format!("right filler clause number {i} with distinct body {i}"))
            .collect();

        let mut left_texts: Vec<&str> = vec!["the shared paragraph moved a long way down"];
        left_texts.extend(filler_left.iter().map(String::as_str));
        let mut right_texts: Vec<&str> = filler_right.iter().map(String::as_str).collect();
        right_texts.push("the shared paragraph moved a long way down");

        let left = doc(SourceSide::Left, &left_texts);
        let right = doc(SourceSide::Right, &right_texts);
        let mut config = CompareConfig::default();
        config.band_min_width = 4;
        config.band_fraction = 0.02;

        let cands = candidates(&left, &right);
        let outcome = align(&left, &right, &cands, &config, Strategy::Exact, None);

        assert!(matches!(outcome, AlignmentOutcome::Escalated(_)));
        // The moved paragraph must still be matched.
        let matched = outcome.path().ops.iter().any(|op| {
            matches!(op, AlignmentOp::Match { left_id, right_id, score }
                if left_id.as_str() == "l0" && right_id.as_str() == "r200" && *score == 1.0)
        });
        assert!(matched, "off-diagonal exact pair should be recovered");
    }
}
