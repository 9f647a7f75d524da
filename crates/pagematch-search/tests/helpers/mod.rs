//! Test helpers for similarity pipeline tests.
//!
//! Provides corpus builders over the in-memory store and a store wrapper
//! that injects failures and latency.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use pagematch_db::InMemoryEmbeddingStore;
use pagematch_search::{
    defaults, CentroidHit, Chunk, Document, DocumentTotals, EmbeddingStore, Error, Result,
    Vector,
};

pub const MODEL: &str = pagematch_search::defaults::EMBED_MODEL;

/// One chunk of a fixture document: inclusive pages, characters, embedding.
#[derive(Debug, Clone)]
pub struct ChunkSpec {
    pub start_page: u32,
    pub end_page: u32,
    pub characters: u64,
    pub embedding: Vec<f32>,
}

pub fn spec(start_page: u32, end_page: u32, characters: u64, embedding: Vec<f32>) -> ChunkSpec {
    ChunkSpec {
        start_page,
        end_page,
        characters,
        embedding,
    }
}

pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn build_chunks(document_id: Uuid, specs: &[ChunkSpec]) -> Vec<Chunk> {
    specs
        .iter()
        .enumerate()
        .map(|(i, s)| Chunk {
            document_id,
            chunk_index: i as u32,
            embedding: Vector::from(s.embedding.clone()),
            start_page: s.start_page,
            end_page: s.end_page,
            character_count: s.characters,
        })
        .collect()
}

fn mean_embedding(specs: &[ChunkSpec]) -> Vec<f32> {
    let dim = specs.first().map(|s| s.embedding.len()).unwrap_or(0);
    let mut mean = vec![0.0f32; dim];
    for s in specs {
        for (m, v) in mean.iter_mut().zip(&s.embedding) {
            *m += v / specs.len() as f32;
        }
    }
    mean
}

/// Totals as an ingestion pipeline records them, straight from the chunk
/// rows: each window that shares a page with the one before it repeats
/// the configured window overlap.
pub fn ingested_totals(specs: &[ChunkSpec]) -> DocumentTotals {
    let mut total = 0u64;
    let mut effective = 0u32;
    for (i, s) in specs.iter().enumerate() {
        let repeated = match i.checked_sub(1).map(|p| &specs[p]) {
            Some(prev) if s.start_page <= prev.end_page && prev.start_page <= s.end_page => {
                defaults::CHUNK_WINDOW_OVERLAP
                    .min(prev.characters)
                    .min(s.characters)
            }
            _ => 0,
        };
        if s.characters > repeated {
            total += s.characters - repeated;
            effective += 1;
        }
    }
    DocumentTotals {
        effective_chunk_count: effective,
        total_characters: total,
    }
}

/// Insert a fully processed document with totals from [`ingested_totals`].
pub fn add_document(
    store: &InMemoryEmbeddingStore,
    document_id: Uuid,
    model: &str,
    specs: &[ChunkSpec],
) -> Document {
    add_document_with_totals(store, document_id, model, specs, ingested_totals(specs))
}

/// Insert a fully processed document with explicit stored totals.
pub fn add_document_with_totals(
    store: &InMemoryEmbeddingStore,
    document_id: Uuid,
    model: &str,
    specs: &[ChunkSpec],
    totals: DocumentTotals,
) -> Document {
    let document = Document {
        id: document_id,
        centroid_embedding: Some(Vector::from(mean_embedding(specs))),
        effective_chunk_count: Some(totals.effective_chunk_count),
        total_characters: Some(totals.total_characters),
        embedding_model: model.to_string(),
    };
    store
        .insert(document.clone(), build_chunks(document_id, specs))
        .expect("fixture document should insert");
    document
}

/// Insert a document that has not finished processing.
pub fn add_incomplete_document(store: &InMemoryEmbeddingStore, document_id: Uuid) -> Document {
    let document = Document {
        id: document_id,
        centroid_embedding: None,
        effective_chunk_count: None,
        total_characters: None,
        embedding_model: MODEL.to_string(),
    };
    store
        .insert(document.clone(), Vec::new())
        .expect("fixture document should insert");
    document
}

/// Deterministic synthetic corpus: `documents` documents of `chunks`
/// overlapping two-page windows with slowly rotating 3-d embeddings.
/// Document ids are `1..=documents`.
pub fn synthetic_corpus(documents: u128, chunks: u32) -> Arc<InMemoryEmbeddingStore> {
    let store = Arc::new(InMemoryEmbeddingStore::new());
    for d in 1..=documents {
        let specs: Vec<ChunkSpec> = (0..chunks)
            .map(|j| {
                let angle = (d as f32 * 0.41) + (j as f32 * 0.23);
                spec(
                    j * 2 + 1,
                    j * 2 + 3,
                    1000 + 37 * u64::from(j) + 11 * d as u64,
                    vec![angle.cos(), angle.sin(), 0.3],
                )
            })
            .collect();
        add_document(&store, id(d), MODEL, &specs);
    }
    store
}

/// The partial-overlap fixture: a 10,000 character source whose first
/// three pages (4,500 characters) reappear as the whole of a 5,000
/// character target.
pub fn partial_overlap_corpus() -> (Arc<InMemoryEmbeddingStore>, Uuid, Uuid) {
    let store = Arc::new(InMemoryEmbeddingStore::new());
    let source = id(100);
    let target = id(200);
    add_document(
        &store,
        source,
        MODEL,
        &[
            spec(1, 3, 4500, vec![1.0, 0.0]),
            spec(4, 10, 5500, vec![0.0, 1.0]),
        ],
    );
    add_document(&store, target, MODEL, &[spec(1, 2, 5000, vec![1.0, 0.0])]);
    (store, source, target)
}

/// A source whose page 5 carries three unrelated 1,000 character chunks,
/// stored with the raw 3,000 character total, and a target that repeats
/// only the middle chunk.
pub fn dense_page_corpus() -> (Arc<InMemoryEmbeddingStore>, Uuid, Uuid) {
    let store = Arc::new(InMemoryEmbeddingStore::new());
    let source = id(400);
    let target = id(500);
    add_document_with_totals(
        &store,
        source,
        MODEL,
        &[
            spec(5, 5, 1000, vec![1.0, 0.0, 0.0]),
            spec(5, 5, 1000, vec![0.0, 1.0, 0.0]),
            spec(5, 5, 1000, vec![0.0, 0.0, 1.0]),
        ],
        DocumentTotals {
            effective_chunk_count: 3,
            total_characters: 3000,
        },
    );
    add_document(&store, target, MODEL, &[spec(1, 1, 1000, vec![0.0, 1.0, 0.0])]);
    (store, source, target)
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

/// Store wrapper that fails or delays selected calls and tracks how many
/// chunk fetches run at once.
pub struct FlakyStore {
    inner: Arc<InMemoryEmbeddingStore>,
    failing_chunks: HashSet<Uuid>,
    failing_totals: HashSet<Uuid>,
    totals_delay: Option<Duration>,
    chunks_delay: Option<Duration>,
    chunk_fetches: AtomicUsize,
    chunk_fetches_peak: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryEmbeddingStore>) -> Self {
        Self {
            inner,
            failing_chunks: HashSet::new(),
            failing_totals: HashSet::new(),
            totals_delay: None,
            chunks_delay: None,
            chunk_fetches: AtomicUsize::new(0),
            chunk_fetches_peak: AtomicUsize::new(0),
        }
    }

    pub fn fail_chunks_for(mut self, id: Uuid) -> Self {
        self.failing_chunks.insert(id);
        self
    }

    pub fn fail_totals_for(mut self, id: Uuid) -> Self {
        self.failing_totals.insert(id);
        self
    }

    pub fn with_totals_delay(mut self, delay: Duration) -> Self {
        self.totals_delay = Some(delay);
        self
    }

    pub fn with_chunks_delay(mut self, delay: Duration) -> Self {
        self.chunks_delay = Some(delay);
        self
    }

    /// Most chunk fetches observed in flight at the same time.
    pub fn peak_chunk_fetches(&self) -> usize {
        self.chunk_fetches_peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingStore for FlakyStore {
    async fn get_document(&self, id: Uuid) -> Result<Document> {
        self.inner.get_document(id).await
    }

    async fn get_document_centroid(&self, id: Uuid) -> Result<Vector> {
        self.inner.get_document_centroid(id).await
    }

    async fn approximate_nearest_centroids(
        &self,
        query: &Vector,
        k: usize,
        model: &str,
    ) -> Result<Vec<CentroidHit>> {
        self.inner.approximate_nearest_centroids(query, k, model).await
    }

    async fn get_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let in_flight = self.chunk_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.chunk_fetches_peak.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.chunks_delay {
            tokio::time::sleep(delay).await;
        }
        self.chunk_fetches.fetch_sub(1, Ordering::SeqCst);

        if self.failing_chunks.contains(&document_id) {
            return Err(Error::Internal(format!("injected chunk failure for {}", document_id)));
        }
        self.inner.get_chunks(document_id).await
    }

    async fn get_document_totals(&self, id: Uuid) -> Result<DocumentTotals> {
        if let Some(delay) = self.totals_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_totals.contains(&id) {
            return Err(Error::Internal(format!("injected totals failure for {}", id)));
        }
        self.inner.get_document_totals(id).await
    }

    async fn corpus_size(&self, model: &str) -> Result<u64> {
        self.inner.corpus_size(model).await
    }
}
