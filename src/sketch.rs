//! Chunk fingerprinting: word shingles hashed into a simhash sketch.
//!
//! `fingerprint` is deterministic and side-effect-free: equal text on
//! either side always yields an equal fingerprint.
//!
//! ## Algorithm
//!
//! 1. Lowercase and split the chunk text into whitespace tokens
//! 2. Form overlapping k-shingles (k from config, default 3)
//! 3. Hash each shingle with seeded xxh64
//! 4. Each sketch bit is the majority sign of the per-bit hash votes
//!
//! Chunks shorter than k tokens hash individual tokens with no shingling.
//! Empty chunks produce a sentinel fingerprint equal only to itself.

use xxhash_rust::xxh64::xxh64;

use crate::types::chunk::Chunk;
use crate::types::fingerprint::{Fingerprint, SKETCH_BITS};

/// Seed for shingle hashing. Changing it invalidates all sketches.
const SHINGLE_HASH_SEED: u64 = 0x6472_6966_745f_6b31;

/// Separator between tokens inside a shingle, chosen to never appear in
/// whitespace-tokenized text.
const SHINGLE_JOIN: &str = "\u{1f}";

/// Compute the simhash fingerprint of a chunk.
pub fn fingerprint(chunk: &Chunk, shingle_size: usize) -> Fingerprint {
    let tokens: Vec<String> = chunk
        .text
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();

    if tokens.is_empty() {
        return Fingerprint {
            chunk_id: chunk.id.clone(),
            sketch: 0,
            token_count: 0,
            empty: true,
        };
    }

    let mut votes = [0i32; SKETCH_BITS as usize];

    if tokens.len() < shingle_size {
        for token in &tokens {
            accumulate(&mut votes, xxh64(token.as_bytes(), SHINGLE_HASH_SEED));
        }
    } else {
        for window in tokens.windows(shingle_size) {
            let shingle = window.join(SHINGLE_JOIN);
            accumulate(&mut votes, xxh64(shingle.as_bytes(), SHINGLE_HASH_SEED));
        }
    }

    let mut sketch = 0u64;
    for (bit, &vote) in votes.iter().enumerate() {
        if vote > 0 {
            sketch |= 1 << bit;
        }
    }

    Fingerprint {
        chunk_id: chunk.id.clone(),
        sketch,
        token_count: tokens.len(),
        empty: false,
    }
}

fn accumulate(votes: &mut [i32; SKETCH_BITS as usize], hash: u64) {
    for (bit, vote) in votes.iter_mut().enumerate() {
        if (hash >> bit) & 1 == 1 {
            *vote += 1;
        } else {
            *vote -= 1;
        }
    }
}
