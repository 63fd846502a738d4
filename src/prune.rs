//! Pruning index: length-banded fingerprint pre-filter.
//!
//! Buckets chunks into geometric length bands (token count, growth factor
//! two) and compares fingerprints only within the same or adjacent bands,
//! bounding work to near-linear in practice. Pairs are admitted at a loose
//! threshold `t_prune`: false negatives here are unrecoverable, while
//! false positives are cheap and filtered by later stages.
//!
//! Documented floor: any pair whose fingerprint similarity is at or above
//! `t_prune` and whose token counts differ by less than a factor of two is
//! guaranteed to be emitted. No ordering guarantee is made on the output.

use std::collections::BTreeMap;

use crate::types::candidate::CandidatePair;
use crate::types::fingerprint::Fingerprint;

/// Geometric length band for a token count.
///
/// Band 0 holds empty chunks; band `ilog2(n) + 1` holds chunks of n
/// tokens. Token counts within a factor of two land in the same or
/// adjacent bands.
pub fn length_band(token_count: usize) -> u32 {
    if token_count == 0 {
        0
    } else {
        token_count.ilog2() + 1
    }
}

/// Produce the reduced candidate set for two fingerprint sequences.
///
/// Both slices must be in document order; positional indexes double as
/// order indexes. Emitted pairs carry the fingerprint similarity estimate
/// on both similarity fields.
pub fn prune(
    left: &[Fingerprint],
    right: &[Fingerprint],
    t_prune: f64,
) -> Vec<CandidatePair> {
    // Band index over the right side, built once per run.
    let mut bands: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (j, fp) in right.iter().enumerate() {
        bands.entry(length_band(fp.token_count)).or_default().push(j);
    }

    let mut pairs = Vec::new();
    for (i, left_fp) in left.iter().enumerate() {
        let band = length_band(left_fp.token_count);
        let low = band.saturating_sub(1);

        for b in low..=band + 1 {
            let Some(js) = bands.get(&b) else { continue };
            for &j in js {
                let sim = left_fp.similarity(&right[j]);
                if sim >= t_prune {
                    pairs.push(CandidatePair::new(
                        left_fp.chunk_id.clone(),
                        right[j].chunk_id.clone(),
                        sim,
                        sim,
                        i.abs_diff(j) as u32,
                    ));
                }
            }
        }
    }
    pairs
}
