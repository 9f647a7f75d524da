//! Environment-driven defaults for the similarity pipeline.
//!
//! Environment variables:
//!   PAGEMATCH_STAGE0_TOP_K           - Stage 0 candidate count (default: 200)
//!   PAGEMATCH_STAGE1_TOP_K           - Stage 1 candidate count (default: 50)
//!   PAGEMATCH_STAGE2_WORKERS         - Stage 2 worker pool size (default: 4)
//!   PAGEMATCH_THRESHOLD              - inclusion threshold (default: 0.90)
//!   PAGEMATCH_SCORE_BASIS            - source|target|max|min|mean (default: max)
//!   PAGEMATCH_CHUNK_MATCH_THRESHOLD  - chunk alignment cosine (default: 0.85)

use std::env;
use std::str::FromStr;

use tracing::warn;

use pagematch_core::{Result, SearchOptions};

pub const ENV_STAGE0_TOP_K: &str = "PAGEMATCH_STAGE0_TOP_K";
pub const ENV_STAGE1_TOP_K: &str = "PAGEMATCH_STAGE1_TOP_K";
pub const ENV_STAGE2_WORKERS: &str = "PAGEMATCH_STAGE2_WORKERS";
pub const ENV_THRESHOLD: &str = "PAGEMATCH_THRESHOLD";
pub const ENV_SCORE_BASIS: &str = "PAGEMATCH_SCORE_BASIS";
pub const ENV_CHUNK_MATCH_THRESHOLD: &str = "PAGEMATCH_CHUNK_MATCH_THRESHOLD";

/// Process-wide pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    /// Options used when a request does not override them
    pub default_options: SearchOptions,
}

impl PipelineConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset or unparsable values keep
    /// their defaults. The result is validated.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = SearchOptions::default();

        override_from(&lookup, ENV_STAGE0_TOP_K, &mut options.stage0_top_k);
        override_from(&lookup, ENV_STAGE1_TOP_K, &mut options.stage1_top_k);
        override_from(
            &lookup,
            ENV_STAGE2_WORKERS,
            &mut options.stage2_parallel_workers,
        );
        override_from(&lookup, ENV_THRESHOLD, &mut options.threshold);
        override_from(&lookup, ENV_SCORE_BASIS, &mut options.score_basis);
        override_from(
            &lookup,
            ENV_CHUNK_MATCH_THRESHOLD,
            &mut options.chunk_match_threshold,
        );

        options.validate()?;
        Ok(Self {
            default_options: options,
        })
    }
}

fn override_from<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = %raw, "Ignoring unparsable pipeline setting"),
    }
}
