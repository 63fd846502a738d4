//! Comparison configuration: threshold ladder and strategy selector.
//!
//! Float parameters are quantized through [`crate::canonical`] before
//! hashing, so `params_hash` is stable across platforms and serializer
//! versions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{canonical_hash_hex, quantize_float};
use crate::DEFAULT_CONFIG_VERSION;

/// Strategy selector determining which refinements are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Fingerprint and token comparison only; no vector refinement.
    Exact,
    /// Vector refinement plus nearest-neighbor expansion.
    Semantic,
    /// Like `Semantic`, with candidate ordering weighted toward page
    /// locality and a narrower alignment band.
    LayoutAware,
    /// Fingerprint-only ladder that never labels `paraphrase` (no vector
    /// evidence by construction).
    Rules,
}

impl Strategy {
    /// Parse strategy from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "exact" => Some(Self::Exact),
            "semantic" => Some(Self::Semantic),
            "layout_aware" => Some(Self::LayoutAware),
            "rules" => Some(Self::Rules),
            _ => None,
        }
    }

    /// Whether embedding vectors refine candidate similarity.
    pub fn uses_vectors(&self) -> bool {
        matches!(self, Self::Semantic | Self::LayoutAware)
    }

    /// Whether top-k nearest-neighbor expansion against the opposing full
    /// document is performed.
    pub fn uses_knn_expansion(&self) -> bool {
        matches!(self, Self::Semantic | Self::LayoutAware)
    }

    /// Whether candidate ordering folds page distance into the locality
    /// tie-break.
    pub fn weights_page_locality(&self) -> bool {
        matches!(self, Self::LayoutAware)
    }

    /// Multiplier applied to the alignment band width.
    pub fn band_width_factor(&self) -> f64 {
        match self {
            Self::LayoutAware => 0.5,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Semantic => write!(f, "semantic"),
            Self::LayoutAware => write!(f, "layout_aware"),
            Self::Rules => write!(f, "rules"),
        }
    }
}

/// Error raised when a configuration violates the threshold ordering.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The ladder must satisfy `t_prune < t_paraphrase < t_similar < t_exact`.
    #[error("Threshold ladder out of order: prune={t_prune}, paraphrase={t_paraphrase}, similar={t_similar}, exact={t_exact}")]
    LadderOutOfOrder {
        /// Pruning admission threshold.
        t_prune: f64,
        /// Paraphrase floor.
        t_paraphrase: f64,
        /// Similar threshold.
        t_similar: f64,
        /// Exact threshold.
        t_exact: f64,
    },
    /// Shingle size outside the supported range.
    #[error("Shingle size {0} outside supported range 2..=8")]
    ShingleSize(usize),
    /// Affine gap penalties must satisfy `gap_open > gap_extend > 0`.
    #[error("Gap penalties out of order: open={gap_open}, extend={gap_extend}")]
    GapPenalties {
        /// Cost of opening a gap run.
        gap_open: f64,
        /// Cost of extending a gap run.
        gap_extend: f64,
    },
}

/// Tunable parameters of one comparison run.
///
/// The design fixes only the *ordering* of the thresholds and their
/// monotonic effect; the defaults below come from the ladder the engine
/// was tuned against and are runtime configuration, not constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Config version identifier.
    pub version: String,
    /// Word shingle size for fingerprinting (2..=8).
    pub shingle_size: usize,
    /// Fingerprint-similarity admission threshold for pruning. Loose by
    /// design: false negatives here are unrecoverable.
    pub t_prune: f64,
    /// Softer floor for `paraphrase` when vector evidence is present.
    pub t_paraphrase: f64,
    /// Similarity at or above which a pair is `similar`.
    pub t_similar: f64,
    /// Similarity at or above which a pair is `exact`.
    pub t_exact: f64,
    /// Similarity at or above which a pair serves as a banding anchor.
    pub t_anchor: f64,
    /// Neighbors fetched per chunk in knn expansion.
    pub knn_k: usize,
    /// Maximum candidates retained per left chunk.
    pub max_candidates_per_chunk: usize,
    /// Penalty for opening an insertion/deletion run.
    pub gap_open: f64,
    /// Penalty for extending an open run. Must be below `gap_open`:
    /// one multi-chunk insertion is more likely than several isolated ones.
    pub gap_extend: f64,
    /// Similarity assumed for (i, j) cells with no candidate pair.
    pub base_similarity: f64,
    /// Minimum half-width of the alignment band, in cells.
    pub band_min_width: usize,
    /// Band half-width as a fraction of the longer document.
    pub band_fraction: f64,
    /// Maximum tokens per side in the token differ window.
    pub max_diff_tokens: usize,
}

impl CompareConfig {
    /// Validate internal ordering constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.t_prune < self.t_paraphrase
            && self.t_paraphrase < self.t_similar
            && self.t_similar < self.t_exact)
        {
            return Err(ConfigError::LadderOutOfOrder {
                t_prune: self.t_prune,
                t_paraphrase: self.t_paraphrase,
                t_similar: self.t_similar,
                t_exact: self.t_exact,
            });
        }
        if !(2..=8).contains(&self.shingle_size) {
            return Err(ConfigError::ShingleSize(self.shingle_size));
        }
        if !(self.gap_open > self.gap_extend && self.gap_extend > 0.0) {
            return Err(ConfigError::GapPenalties {
                gap_open: self.gap_open,
                gap_extend: self.gap_extend,
            });
        }
        Ok(())
    }

    /// Get the config ID.
    pub fn config_id(&self) -> &str {
        &self.version
    }

    /// Compute a hash of the configuration parameters.
    ///
    /// Uses quantized float representation so identical configurations
    /// hash identically across platforms and serializer versions.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&self.to_quantized())
    }

    fn to_quantized(&self) -> QuantizedConfigParams {
        QuantizedConfigParams {
            version: self.version.clone(),
            shingle_size: self.shingle_size,
            t_prune: quantize_float(self.t_prune),
            t_paraphrase: quantize_float(self.t_paraphrase),
            t_similar: quantize_float(self.t_similar),
            t_exact: quantize_float(self.t_exact),
            t_anchor: quantize_float(self.t_anchor),
            knn_k: self.knn_k,
            max_candidates_per_chunk: self.max_candidates_per_chunk,
            gap_open: quantize_float(self.gap_open),
            gap_extend: quantize_float(self.gap_extend),
            base_similarity: quantize_float(self.base_similarity),
            band_min_width: self.band_min_width,
            band_fraction: quantize_float(self.band_fraction),
            max_diff_tokens: self.max_diff_tokens,
        }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_CONFIG_VERSION.to_string(),
            shingle_size: 3,
            t_prune: 0.5,
            t_paraphrase: 0.7,
            t_similar: 0.9,
            t_exact: 0.98,
            t_anchor: 0.9,
            knn_k: 3,
            max_candidates_per_chunk: 8,
            gap_open: 0.6,
            gap_extend: 0.2,
            base_similarity: 0.0,
            band_min_width: 32,
            band_fraction: 0.1,
            max_diff_tokens: 512,
        }
    }
}

/// Quantized configuration for deterministic hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuantizedConfigParams {
    version: String,
    shingle_size: usize,
    t_prune: i64,
    t_paraphrase: i64,
    t_similar: i64,
    t_exact: i64,
    t_anchor: i64,
    knn_k: usize,
    max_candidates_per_chunk: usize,
    gap_open: i64,
    gap_extend: i64,
    base_similarity: i64,
    band_min_width: usize,
    band_fraction: i64,
    max_diff_tokens: usize,
}
