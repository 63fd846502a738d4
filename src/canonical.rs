//! Canonical serialization for deterministic hashing.
//!
//! Configuration fingerprints and test goldens hash through this module so
//! that identical inputs produce identical digests across runs and
//! platforms. Every [`crate::types::report::ComparisonRun`] records the
//! digest of the configuration it executed under, which is how operators
//! tie a recorded run back to its exact threshold ladder.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable Vec order: vectors serialize in index order
//! - No HashMap allowed: use BTreeMap for maps in hashed data
//! - Floats quantized with [`quantize_float`] before entering hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Seed for canonical digests. Changing it invalidates every recorded
/// params hash.
const CANONICAL_HASH_SEED: u64 = 0x6472_6966_745f_6832;

/// Quantization factor for float normalization.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an i64 for deterministic hashing.
///
/// Multiplies by 1e6 and rounds, avoiding cross-platform and
/// cross-language float serialization differences.
pub fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// Compute the canonical digest of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), CANONICAL_HASH_SEED)
}

/// Canonical digest rendered as a fixed-width hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}
