//! In-memory [`EmbeddingStore`] for tests, fixtures and small corpora.
//!
//! The centroid "index" here is an exact scan, which trivially satisfies the
//! approximate contract. Production corpora use [`crate::PgEmbeddingStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use pgvector::Vector;
use uuid::Uuid;

use pagematch_core::{
    cosine_similarity, CentroidHit, Chunk, Document, DocumentTotals, EmbeddingStore, Error,
    Result,
};

struct StoredDocument {
    document: Document,
    chunks: Vec<Chunk>,
}

/// Thread-safe map of documents and their chunks.
#[derive(Default)]
pub struct InMemoryEmbeddingStore {
    documents: RwLock<HashMap<Uuid, StoredDocument>>,
    index_lookups: AtomicUsize,
}

impl InMemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document with its chunks.
    ///
    /// Chunks are re-ordered by `chunk_index`; duplicate indexes and
    /// inverted page ranges are rejected.
    pub fn insert(&self, document: Document, mut chunks: Vec<Chunk>) -> Result<()> {
        chunks.sort_by_key(|c| c.chunk_index);
        if let Some(w) = chunks
            .windows(2)
            .find(|w| w[0].chunk_index == w[1].chunk_index)
        {
            return Err(Error::InvalidInput(format!(
                "duplicate chunk_index {} for document {}",
                w[0].chunk_index, document.id
            )));
        }
        if let Some(c) = chunks.iter().find(|c| c.start_page > c.end_page) {
            return Err(Error::InvalidInput(format!(
                "chunk {} of document {} has start_page {} > end_page {}",
                c.chunk_index, document.id, c.start_page, c.end_page
            )));
        }

        let mut documents = self.write()?;
        documents.insert(document.id, StoredDocument { document, chunks });
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_document(self, document: Document, chunks: Vec<Chunk>) -> Result<Self> {
        self.insert(document, chunks)?;
        Ok(self)
    }

    /// Number of centroid index scans served so far.
    pub fn index_lookups(&self) -> usize {
        self.index_lookups.load(Ordering::SeqCst)
    }

    /// Number of stored documents, complete or not.
    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, StoredDocument>>> {
        self.documents
            .read()
            .map_err(|_| Error::Internal("document map lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, StoredDocument>>> {
        self.documents
            .write()
            .map_err(|_| Error::Internal("document map lock poisoned".to_string()))
    }
}

#[async_trait]
impl EmbeddingStore for InMemoryEmbeddingStore {
    async fn get_document(&self, id: Uuid) -> Result<Document> {
        self.read()?
            .get(&id)
            .map(|stored| stored.document.clone())
            .ok_or(Error::DocumentNotFound(id))
    }

    async fn get_document_centroid(&self, id: Uuid) -> Result<Vector> {
        let documents = self.read()?;
        let stored = documents.get(&id).ok_or(Error::DocumentNotFound(id))?;
        stored
            .document
            .centroid_embedding
            .clone()
            .ok_or_else(|| Error::NotFound(format!("centroid for document {}", id)))
    }

    async fn approximate_nearest_centroids(
        &self,
        query: &Vector,
        k: usize,
        model: &str,
    ) -> Result<Vec<CentroidHit>> {
        self.index_lookups.fetch_add(1, Ordering::SeqCst);

        let documents = self.read()?;
        let mut hits = Vec::new();
        for stored in documents.values() {
            let doc = &stored.document;
            if doc.embedding_model != model || !doc.is_complete() {
                continue;
            }
            let Some(centroid) = doc.centroid_embedding.as_ref() else {
                continue;
            };
            // Same model but different width means corrupt data; skip it
            // rather than failing the whole scan.
            let Ok(score) = cosine_similarity(query.as_slice(), centroid.as_slice()) else {
                continue;
            };
            hits.push(CentroidHit {
                document_id: doc.id,
                embedding_model: doc.embedding_model.clone(),
                score,
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn get_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        self.read()?
            .get(&document_id)
            .map(|stored| stored.chunks.clone())
            .ok_or(Error::DocumentNotFound(document_id))
    }

    async fn get_document_totals(&self, id: Uuid) -> Result<DocumentTotals> {
        self.read()?
            .get(&id)
            .ok_or(Error::DocumentNotFound(id))?
            .document
            .totals()
            .ok_or(Error::IncompleteDocument(id))
    }

    async fn corpus_size(&self, model: &str) -> Result<u64> {
        Ok(self
            .read()?
            .values()
            .filter(|s| s.document.embedding_model == model && s.document.is_complete())
            .count() as u64)
    }
}
