//! Search options and inclusion policy.

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::SearchResult;

/// Which score (or combination) the inclusion threshold and final ordering
/// are applied to.
///
/// "Source covers 90% of target" and "target covers 90% of source" are
/// different relationships; callers pick the one they care about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBasis {
    /// Fraction of the source's characters matched
    Source,
    /// Fraction of the candidate's characters matched
    Target,
    /// Larger of the two (default)
    #[default]
    Max,
    /// Smaller of the two
    Min,
    /// Arithmetic mean of the two
    Mean,
}

impl ScoreBasis {
    /// Primary score of a result under this basis.
    pub fn primary_score(&self, result: &SearchResult) -> f32 {
        let (s, t) = (result.source_score, result.target_score);
        match self {
            ScoreBasis::Source => s,
            ScoreBasis::Target => t,
            ScoreBasis::Max => s.max(t),
            ScoreBasis::Min => s.min(t),
            ScoreBasis::Mean => (s + t) / 2.0,
        }
    }
}

impl std::fmt::Display for ScoreBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
            Self::Max => write!(f, "max"),
            Self::Min => write!(f, "min"),
            Self::Mean => write!(f, "mean"),
        }
    }
}

impl std::str::FromStr for ScoreBasis {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "source" => Ok(Self::Source),
            "target" => Ok(Self::Target),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "mean" => Ok(Self::Mean),
            _ => Err(format!("Invalid score basis: {}", s)),
        }
    }
}

/// Per-query knobs for the similarity funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Candidates taken from the approximate centroid index
    pub stage0_top_k: usize,
    /// Candidates kept after chunk-level refinement
    pub stage1_top_k: usize,
    /// Concurrent candidate scorers (1 = sequential, deterministic benchmarking)
    pub stage2_parallel_workers: usize,
    /// Inclusion threshold on the primary score, in `[0, 1]`
    pub threshold: f32,
    pub score_basis: ScoreBasis,
    /// Minimum cosine for a chunk pair to be aligned, in `[0, 1]`
    pub chunk_match_threshold: f32,
    /// Expected embedding model of the source; mismatch fails the search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            stage0_top_k: defaults::STAGE0_TOP_K,
            stage1_top_k: defaults::STAGE1_TOP_K,
            stage2_parallel_workers: defaults::STAGE2_PARALLEL_WORKERS,
            threshold: defaults::INCLUSION_THRESHOLD,
            score_basis: ScoreBasis::default(),
            chunk_match_threshold: defaults::CHUNK_MATCH_THRESHOLD,
            embedding_model: None,
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Stage 0 candidate count.
    pub fn with_stage0_top_k(mut self, k: usize) -> Self {
        self.stage0_top_k = k;
        self
    }

    /// Set the Stage 1 candidate count.
    pub fn with_stage1_top_k(mut self, k: usize) -> Self {
        self.stage1_top_k = k;
        self
    }

    /// Set the Stage 2 worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.stage2_parallel_workers = workers;
        self
    }

    /// Set the inclusion threshold and the score it applies to.
    pub fn with_threshold(mut self, threshold: f32, basis: ScoreBasis) -> Self {
        self.threshold = threshold;
        self.score_basis = basis;
        self
    }

    /// Set the chunk alignment threshold.
    pub fn with_chunk_match_threshold(mut self, threshold: f32) -> Self {
        self.chunk_match_threshold = threshold;
        self
    }

    /// Require the source document to live in this embedding space.
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Reject option combinations the funnel cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.stage0_top_k == 0 || self.stage0_top_k > defaults::MAX_STAGE0_TOP_K {
            return Err(Error::InvalidInput(format!(
                "stage0_top_k must be between 1 and {}, got {}",
                defaults::MAX_STAGE0_TOP_K,
                self.stage0_top_k
            )));
        }
        if self.stage1_top_k == 0 {
            return Err(Error::InvalidInput(
                "stage1_top_k must be at least 1".to_string(),
            ));
        }
        if self.stage2_parallel_workers == 0
            || self.stage2_parallel_workers > defaults::MAX_STAGE2_WORKERS
        {
            return Err(Error::InvalidInput(format!(
                "stage2_parallel_workers must be between 1 and {}, got {}",
                defaults::MAX_STAGE2_WORKERS,
                self.stage2_parallel_workers
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidInput(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.chunk_match_threshold) {
            return Err(Error::InvalidInput(format!(
                "chunk_match_threshold must be within [0, 1], got {}",
                self.chunk_match_threshold
            )));
        }
        Ok(())
    }

    /// Whether a scored result clears the inclusion threshold.
    pub fn includes(&self, result: &SearchResult) -> bool {
        self.score_basis.primary_score(result) >= self.threshold
    }
}
