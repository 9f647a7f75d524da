//! Core traits for pagematch abstractions.
//!
//! The similarity pipeline only ever reads from an [`EmbeddingStore`];
//! ingestion and embedding generation live elsewhere.

use async_trait::async_trait;
use pgvector::Vector;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// EMBEDDING STORE
// =============================================================================

/// Read-only access to document centroids, chunks and totals.
///
/// Implementations must tolerate concurrent reads: Stage 2 workers call
/// `get_chunks` and `get_document_totals` in parallel.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    /// Fetch a document's processing state and centroid.
    async fn get_document(&self, id: Uuid) -> Result<Document>;

    /// Fetch a document's centroid embedding.
    ///
    /// Fails with `NotFound` when the document has no centroid yet.
    async fn get_document_centroid(&self, id: Uuid) -> Result<Vector>;

    /// Approximate nearest neighbours by centroid, restricted to one
    /// embedding model, ordered by descending cosine similarity.
    ///
    /// Results may be stale; callers must not treat them as exhaustive.
    async fn approximate_nearest_centroids(
        &self,
        query: &Vector,
        k: usize,
        model: &str,
    ) -> Result<Vec<CentroidHit>>;

    /// All chunks of a document, ordered by `chunk_index`.
    async fn get_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>>;

    /// De-overlapped size of a document.
    async fn get_document_totals(&self, id: Uuid) -> Result<DocumentTotals>;

    /// Number of searchable documents in an embedding space.
    async fn corpus_size(&self, model: &str) -> Result<u64>;
}
