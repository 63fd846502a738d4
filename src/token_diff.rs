//! Token differ: minimal edit script between two chunk texts.
//!
//! Invoked only for aligned pairs judged related but not identical, to
//! localize the exact insertions and deletions inside the pair. Classic
//! shortest-edit-distance over whitespace token sequences, bounded by a
//! maximum token count: very long chunks are diffed on a truncated window
//! flagged as partial, never silently skipped.

use crate::types::report::{EditScript, TokenEditKind, TokenOp};

/// Compute a minimal token-level edit script.
///
/// `max_tokens` bounds the window per side. Deterministic: equal inputs
/// always produce the identical script.
pub fn diff_tokens(left_text: &str, right_text: &str, max_tokens: usize) -> EditScript {
    let left_all: Vec<&str> = left_text.split_whitespace().collect();
    let right_all: Vec<&str> = right_text.split_whitespace().collect();

    let partial = left_all.len() > max_tokens || right_all.len() > max_tokens;
    let left = &left_all[..left_all.len().min(max_tokens)];
    let right = &right_all[..right_all.len().min(max_tokens)];

    EditScript {
        ops: edit_ops(left, right),
        partial,
    }
}

/// LCS-based edit operations, left-to-right.
///
/// Ties in the backtrack prefer Delete over Insert so left-side removals
/// precede right-side additions at the same position.
fn edit_ops(left: &[&str], right: &[&str]) -> Vec<TokenOp> {
    let n = left.len();
    let m = right.len();

    if n == 0 {
        return right.iter().map(|t| op(TokenEditKind::Insert, t)).collect();
    }
    if m == 0 {
        return left.iter().map(|t| op(TokenEditKind::Delete, t)).collect();
    }

    // lcs[i][j] = LCS length of left[i..] and right[j..].
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if left[i] == right[j] {
                lcs[(i + 1) * width + (j + 1)] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + (j + 1)])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if left[i] == right[j] {
            ops.push(op(TokenEditKind::Equal, left[i]));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + (j + 1)] {
            ops.push(op(TokenEditKind::Delete, left[i]));
            i += 1;
        } else {
            ops.push(op(TokenEditKind::Insert, right[j]));
            j += 1;
        }
    }
    ops.extend(left[i..].iter().map(|t| op(TokenEditKind::Delete, t)));
    ops.extend(right[j..].iter().map(|t| op(TokenEditKind::Insert, t)));
    ops
}

fn op(kind: TokenEditKind, text: &str) -> TokenOp {
    TokenOp {
        kind,
        text: text.to_string(),
    }
}
