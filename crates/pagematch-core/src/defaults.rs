//! Centralized default constants for pagematch.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// FUNNEL SIZES
// =============================================================================

/// Candidates requested from the approximate centroid index (Stage 0).
pub const STAGE0_TOP_K: usize = 200;

/// Candidates kept after chunk-level refinement (Stage 1).
pub const STAGE1_TOP_K: usize = 50;

/// Concurrent candidate scorers in Stage 2.
pub const STAGE2_PARALLEL_WORKERS: usize = 4;

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Inclusion threshold applied to the primary score of each result.
pub const INCLUSION_THRESHOLD: f32 = 0.90;

/// Minimum cosine similarity for a chunk pair to count as aligned.
pub const CHUNK_MATCH_THRESHOLD: f32 = 0.85;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Embedding model tag most deployments index with.
pub const EMBED_MODEL: &str = "nomic-embed-text";

// =============================================================================
// CENTROID INDEX
// =============================================================================

/// Largest `hnsw.ef_search` pgvector accepts.
pub const HNSW_MAX_EF_SEARCH: u32 = 1000;

/// Seconds a counted corpus size is reused for `ef_search` tuning.
pub const CORPUS_SIZE_TTL_SECS: u64 = 300;

// =============================================================================
// CHUNKING
// =============================================================================

/// Characters a sliding-window chunk repeats from the window before it.
pub const CHUNK_WINDOW_OVERLAP: u64 = 100;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Upper bound accepted for `stage0_top_k` on a single request.
///
/// Stage 0 asks the index for one extra neighbour (the source itself), and
/// HNSW cannot return more than `ef_search` rows.
pub const MAX_STAGE0_TOP_K: usize = HNSW_MAX_EF_SEARCH as usize - 1;

/// Upper bound accepted for `stage2_parallel_workers` on a single request.
pub const MAX_STAGE2_WORKERS: usize = 64;
