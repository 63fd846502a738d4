//! Similarity-preserving chunk fingerprints.
//!
//! A fingerprint is a 64-bit simhash sketch: each bit is the majority sign
//! of hash contributions from the chunk's word shingles. More shared
//! shingles means a smaller Hamming distance between sketches, so sketch
//! similarity approximates textual similarity monotonically.

use serde::{Deserialize, Serialize};

use crate::types::chunk::ChunkId;

/// Width of the simhash sketch in bits.
pub const SKETCH_BITS: u32 = 64;

/// A similarity-preserving sketch of one chunk's content.
///
/// Derived deterministically from the chunk text: equal text always yields
/// an equal fingerprint, regardless of which side it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// The chunk this fingerprint was computed from.
    pub chunk_id: ChunkId,
    /// 64-bit simhash sketch.
    pub sketch: u64,
    /// Number of whitespace tokens in the source text.
    pub token_count: usize,
    /// Sentinel marker for empty chunks. A sentinel fingerprint is equal
    /// only to other sentinels and dissimilar to everything else.
    pub empty: bool,
}

impl Fingerprint {
    /// Estimated similarity in [0, 1] between two fingerprints.
    ///
    /// `1 - hamming / 64` for ordinary sketches. Sentinels compare as
    /// identical to each other and maximally distant from non-sentinels.
    pub fn similarity(&self, other: &Fingerprint) -> f64 {
        match (self.empty, other.empty) {
            (true, true) => 1.0,
            (true, false) | (false, true) => 0.0,
            (false, false) => {
                let hamming = (self.sketch ^ other.sketch).count_ones();
                1.0 - f64::from(hamming) / f64::from(SKETCH_BITS)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(id: &str, sketch: u64, empty: bool) -> Fingerprint {
        Fingerprint {
            chunk_id: ChunkId::new(id),
            sketch,
            token_count: if empty { 0 } else { 4 },
            empty,
        }
    }

    #[test]
    fn test_identical_sketches_are_fully_similar() {
        let a = fp("a", 0xDEAD_BEEF, false);
        let b = fp("b", 0xDEAD_BEEF, false);
        assert_eq!(a.similarity(&b), 1.0);
    }

    #[test]
    fn test_similarity_decreases_with_hamming_distance() {
        let a = fp("a", 0, false);
        let one_bit = fp("b", 1, false);
        let many_bits = fp("c", u64::MAX, false);

        assert!(a.similarity(&one_bit) > a.similarity(&many_bits));
        assert_eq!(a.similarity(&many_bits), 0.0);
    }

    #[test]
    fn test_sentinel_matches_only_sentinel() {
        let empty_a = fp("a", 0, true);
        let empty_b = fp("b", 0, true);
        let full = fp("c", 0, false);

        assert_eq!(empty_a.similarity(&empty_b), 1.0);
        assert_eq!(empty_a.similarity(&full), 0.0);
    }
}
