//! Core data models for pagematch.

use pgvector::Vector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// STORED ENTITIES
// =============================================================================

/// A processed document as seen by the similarity pipeline.
///
/// `centroid_embedding` and `total_characters` are filled in once text
/// extraction and embedding finish. Until both are present the document is
/// invisible to similarity search.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub centroid_embedding: Option<Vector>,
    /// Chunk count after de-overlapping
    pub effective_chunk_count: Option<u32>,
    /// Character count across de-overlapped chunks
    pub total_characters: Option<u64>,
    /// Tag of the embedding space; vectors from different models are never compared
    pub embedding_model: String,
}

impl Document {
    /// Whether the document finished processing and may take part in a search.
    pub fn is_complete(&self) -> bool {
        self.centroid_embedding.is_some() && self.total_characters.is_some()
    }

    /// Totals, if processing completed.
    pub fn totals(&self) -> Option<DocumentTotals> {
        self.total_characters.map(|total_characters| DocumentTotals {
            effective_chunk_count: self.effective_chunk_count.unwrap_or(0),
            total_characters,
        })
    }
}

/// A windowed slice of a document's extracted text with its own embedding.
///
/// Consecutive chunks may share pages; `start_page..=end_page` is inclusive.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub document_id: Uuid,
    pub chunk_index: u32,
    pub embedding: Vector,
    pub start_page: u32,
    pub end_page: u32,
    pub character_count: u64,
}

impl Chunk {
    /// Whether the two inclusive page ranges have a page in common.
    pub fn shares_pages_with(&self, other: &Chunk) -> bool {
        self.start_page <= other.end_page && other.start_page <= self.end_page
    }
}

/// De-overlapped size of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub effective_chunk_count: u32,
    pub total_characters: u64,
}

/// One row returned by the approximate centroid index.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidHit {
    pub document_id: Uuid,
    pub embedding_model: String,
    /// Cosine similarity between the query centroid and this document's centroid
    pub score: f32,
}

// =============================================================================
// PIPELINE TRANSIENTS
// =============================================================================

/// Funnel stage that produced a candidate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prefilter,
    Refined,
}

/// A document that survived a funnel stage, with that stage's estimate.
///
/// Owned by a single pipeline run and dropped once Stage 2 scores it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityCandidate {
    pub document_id: Uuid,
    pub embedding_model: String,
    pub score: f32,
    pub stage: Stage,
}

/// A contiguous page range in the candidate judged similar to a page range
/// in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMatch {
    pub source_start_page: u32,
    pub source_end_page: u32,
    pub target_start_page: u32,
    pub target_end_page: u32,
    /// Mean cosine similarity of the aligned chunk pairs in this section
    pub score: f32,
    /// Number of aligned chunk pairs merged into this section
    pub aligned_pairs: u32,
    pub source_characters: u64,
    pub target_characters: u64,
}

/// Exact, page-aware comparison of one candidate against the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: Uuid,
    /// Fraction of the source document's characters that found a match
    pub source_score: f32,
    /// Fraction of the candidate document's characters that matched
    pub target_score: f32,
    pub matched_source_characters: u64,
    pub matched_target_characters: u64,
    /// Distinct source chunks with at least one aligned partner
    pub matched_chunks: u32,
    /// Highest chunk-pair cosine seen while aligning
    pub best_chunk_similarity: f32,
    pub sections: Vec<SectionMatch>,
}

/// Wall-clock time per stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub stage0_ms: f64,
    pub stage1_ms: f64,
    pub stage2_ms: f64,
    pub total_ms: f64,
}

/// How many candidates each stage handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelCounts {
    pub stage0_candidates: usize,
    pub stage1_candidates: usize,
    pub stage2_scored: usize,
    pub stage2_failed: usize,
    pub included: usize,
}

/// Full answer to a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub timing: Timing,
    pub funnel: FunnelCounts,
}
