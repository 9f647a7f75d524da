//! # pagematch-search
//!
//! Staged document similarity search.
//!
//! This crate provides:
//! - Stage 0: candidate prefilter over the approximate centroid index
//! - Stage 1: refined ranking by best chunk-pair similarity
//! - Stage 2: exact chunk alignment scored over de-overlapped character spans
//! - The [`SimilaritySearchEngine`] orchestrator with cancellation support
//!
//! ## Example
//!
//! ```ignore
//! use pagematch_search::{SimilaritySearchEngine, SearchOptions, ScoreBasis};
//! use pagematch_db::Database;
//!
//! let db = Database::connect("postgres://...").await?;
//! let engine = SimilaritySearchEngine::new(db.store());
//!
//! let options = SearchOptions::default().with_threshold(0.9, ScoreBasis::Target);
//! let response = engine.search(document_id, &options).await?;
//! for hit in response.results {
//!     println!("{} {:.2}", hit.document_id, hit.target_score);
//! }
//! ```

pub mod alignment;
pub mod cancellation;
pub mod config;
pub mod deoverlap;
pub mod engine;
pub mod prefilter;
pub mod refine;
pub mod scoring;
pub mod similarity;

// Re-export core types
pub use pagematch_core::*;

pub use alignment::{build_sections, coverage_score, score_candidate, SourceProfile};
pub use cancellation::{CancellationHandle, CancellationSignal};
pub use config::PipelineConfig;
pub use deoverlap::{deoverlap, deoverlap_with_window, Segment, Timeline};
pub use engine::SimilaritySearchEngine;
pub use prefilter::{run_prefilter, select_prefilter_candidates};
pub use refine::{
    gather_candidate_chunks, max_pair_similarity, refine_candidates, CandidateChunks,
    RefinedCandidate,
};
pub use scoring::{score_candidates, Stage2Outcome};
pub use similarity::{AlignedPair, Alignment, SimilarityMatrix};
