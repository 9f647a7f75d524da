//! HNSW `ef_search` selection for the centroid prefilter.
//!
//! The prefilter asks for `k` neighbours; HNSW can return at most
//! `ef_search` of them, so ef is scaled with corpus size for recall and
//! never allowed to drop below `k`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use pagematch_core::defaults;

/// Recall target for the approximate centroid scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecallTarget {
    /// Moderate recall (~85%)
    Fast,
    /// Balanced recall/latency (~92%)
    #[default]
    Balanced,
    /// High recall (~96%)
    High,
    /// Near-exhaustive (~99%)
    Exhaustive,
}

impl RecallTarget {
    /// Base ef_search for a corpus of up to 10k centroids.
    pub fn base_ef(&self) -> u32 {
        match self {
            RecallTarget::Fast => 20,
            RecallTarget::Balanced => 40,
            RecallTarget::High => 100,
            RecallTarget::Exhaustive => 200,
        }
    }
}

impl std::str::FromStr for RecallTarget {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "high" => Ok(Self::High),
            "exhaustive" => Ok(Self::Exhaustive),
            _ => Err(format!("Invalid recall target: {}", s)),
        }
    }
}

/// Bounds and scaling for ef_search selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswTuningConfig {
    pub target: RecallTarget,
    /// Multiplier on the log2 corpus-size growth term
    pub corpus_scale_factor: f32,
    pub min_ef: u32,
    /// pgvector rejects ef_search above 1000
    pub max_ef: u32,
    /// How long a counted corpus size is reused before recounting
    pub corpus_size_ttl: Duration,
}

impl Default for HnswTuningConfig {
    fn default() -> Self {
        Self {
            target: RecallTarget::Balanced,
            corpus_scale_factor: 1.0,
            min_ef: 10,
            max_ef: defaults::HNSW_MAX_EF_SEARCH,
            corpus_size_ttl: Duration::from_secs(defaults::CORPUS_SIZE_TTL_SECS),
        }
    }
}

impl HnswTuningConfig {
    /// Read `PAGEMATCH_RECALL_TARGET` (falling back to `Balanced`) and
    /// `PAGEMATCH_CORPUS_SIZE_TTL_SECS`.
    pub fn from_env() -> Self {
        let target = std::env::var("PAGEMATCH_RECALL_TARGET")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let corpus_size_ttl = std::env::var("PAGEMATCH_CORPUS_SIZE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(defaults::CORPUS_SIZE_TTL_SECS));
        Self {
            target,
            corpus_size_ttl,
            ..Default::default()
        }
    }
}

/// ef_search for a `k`-neighbour query over `corpus_size` centroids.
///
/// ef = base_ef * (1 + max(0, log2(corpus_size / 10000)) * scale), then
/// raised to at least `k` and clamped to `[min_ef, max_ef]`.
pub fn compute_ef(k: usize, corpus_size: u64, config: &HnswTuningConfig) -> u32 {
    let base = config.target.base_ef() as f32;

    let size_ratio = corpus_size as f32 / 10000.0;
    let scale = if size_ratio > 1.0 {
        size_ratio.log2() * config.corpus_scale_factor
    } else {
        0.0
    };

    let ef = (base * (1.0 + scale)).round() as u32;
    let ef = ef.max(k.min(u32::MAX as usize) as u32);

    ef.clamp(config.min_ef, config.max_ef)
}
