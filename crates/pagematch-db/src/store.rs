//! PostgreSQL + pgvector implementation of [`EmbeddingStore`].

use std::sync::Arc;

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use pagematch_core::{
    CentroidHit, Chunk, Document, DocumentTotals, EmbeddingStore, Error, Result,
};

use crate::corpus_size::CorpusSizeCache;
use crate::hnsw_tuning::{compute_ef, HnswTuningConfig};

/// Embedding store backed by the `document` and `document_chunk` tables.
///
/// Centroid lookups go through the HNSW index with a per-query
/// `hnsw.ef_search` chosen by [`compute_ef`]. The corpus size feeding that
/// choice is counted at most once per `corpus_size_ttl` per model.
///
/// The HNSW index is shared by every embedding model of a given
/// dimension, so the model filter is applied to the `ef_search` rows the
/// index yields. When other models dominate the neighbourhood, fewer than
/// `k` hits come back; a partial index per model avoids this.
#[derive(Clone)]
pub struct PgEmbeddingStore {
    pool: Pool<Postgres>,
    tuning: HnswTuningConfig,
    corpus_sizes: Arc<CorpusSizeCache>,
}

impl PgEmbeddingStore {
    /// Create a new store with the default tuning.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::with_config(pool, HnswTuningConfig::default())
    }

    fn with_config(pool: Pool<Postgres>, tuning: HnswTuningConfig) -> Self {
        Self {
            pool,
            corpus_sizes: Arc::new(CorpusSizeCache::new(tuning.corpus_size_ttl)),
            tuning,
        }
    }

    /// Override HNSW tuning. Cached corpus sizes are discarded.
    pub fn with_tuning(self, tuning: HnswTuningConfig) -> Self {
        Self::with_config(self.pool, tuning)
    }

    /// Corpus size for ef tuning, recounted once the cached value expires.
    async fn tuning_corpus_size(&self, model: &str) -> Result<u64> {
        if let Some(size) = self.corpus_sizes.get(model).await {
            return Ok(size);
        }
        let size = self.corpus_size(model).await?;
        self.corpus_sizes.insert(model, size).await;
        debug!(
            subsystem = "db",
            component = "centroid_index",
            corpus_size = size,
            ttl_secs = self.corpus_sizes.ttl().as_secs(),
            "Refreshed corpus size"
        );
        Ok(size)
    }

    /// Force the next prefilter query to recount corpus sizes.
    pub async fn invalidate_corpus_sizes(&self) {
        self.corpus_sizes.invalidate().await;
    }

    fn map_document(row: &PgRow) -> Document {
        Document {
            id: row.get("id"),
            centroid_embedding: row.get("centroid"),
            effective_chunk_count: row
                .get::<Option<i32>, _>("effective_chunk_count")
                .map(|n| n.max(0) as u32),
            total_characters: row
                .get::<Option<i64>, _>("total_characters")
                .map(|n| n.max(0) as u64),
            embedding_model: row.get("embedding_model"),
        }
    }

    fn map_chunk(row: &PgRow) -> Chunk {
        Chunk {
            document_id: row.get("document_id"),
            chunk_index: row.get::<i32, _>("chunk_index").max(0) as u32,
            embedding: row.get("embedding"),
            start_page: row.get::<i32, _>("start_page").max(0) as u32,
            end_page: row.get::<i32, _>("end_page").max(0) as u32,
            character_count: row.get::<i64, _>("character_count").max(0) as u64,
        }
    }
}

#[async_trait]
impl EmbeddingStore for PgEmbeddingStore {
    async fn get_document(&self, id: Uuid) -> Result<Document> {
        let row = sqlx::query(
            "SELECT id, embedding_model, centroid, effective_chunk_count, total_characters
             FROM document
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::DocumentNotFound(id))?;

        Ok(Self::map_document(&row))
    }

    async fn get_document_centroid(&self, id: Uuid) -> Result<Vector> {
        let row = sqlx::query("SELECT centroid FROM document WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::DocumentNotFound(id))?;

        row.get::<Option<Vector>, _>("centroid")
            .ok_or_else(|| Error::NotFound(format!("centroid for document {}", id)))
    }

    #[instrument(skip(self, query), fields(subsystem = "db", component = "centroid_index"))]
    async fn approximate_nearest_centroids(
        &self,
        query: &Vector,
        k: usize,
        model: &str,
    ) -> Result<Vec<CentroidHit>> {
        let dim = query.as_slice().len();
        if dim == 0 {
            return Err(Error::InvalidInput("empty query vector".to_string()));
        }

        let corpus_size = self.tuning_corpus_size(model).await?;
        let ef = compute_ef(k, corpus_size, &self.tuning);
        debug!(corpus_size, ef_search = ef, "Selected HNSW ef_search");

        // The cast to a fixed-width vector matches the per-dimension
        // expression index created by the migration.
        let sql = format!(
            r#"
            SELECT id,
                   embedding_model,
                   (1.0 - ((centroid::vector({dim})) <=> $1::vector({dim})))::float8 AS score
            FROM document
            WHERE embedding_model = $2
              AND centroid IS NOT NULL
              AND total_characters IS NOT NULL
              AND vector_dims(centroid) = {dim}
            ORDER BY (centroid::vector({dim})) <=> $1::vector({dim})
            LIMIT $3
            "#,
            dim = dim
        );

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query(&format!("SET LOCAL hnsw.ef_search = {}", ef))
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let rows = sqlx::query(&sql)
            .bind(query)
            .bind(model)
            .bind(k as i64)
            .fetch_all(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;

        if rows.len() < k && (rows.len() as u64) < corpus_size {
            warn!(
                subsystem = "db",
                component = "centroid_index",
                requested = k,
                returned = rows.len(),
                corpus_size,
                ef_search = ef,
                "Centroid index returned fewer neighbours than requested"
            );
        }

        Ok(rows
            .into_iter()
            .map(|row| CentroidHit {
                document_id: row.get("id"),
                embedding_model: row.get("embedding_model"),
                score: row.get::<f64, _>("score") as f32,
            })
            .collect())
    }

    async fn get_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT document_id, chunk_index, embedding, start_page, end_page, character_count
             FROM document_chunk
             WHERE document_id = $1
             ORDER BY chunk_index",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::map_chunk).collect())
    }

    async fn get_document_totals(&self, id: Uuid) -> Result<DocumentTotals> {
        self.get_document(id)
            .await?
            .totals()
            .ok_or(Error::IncompleteDocument(id))
    }

    /// Exact count; the prefilter goes through the TTL cache instead.
    async fn corpus_size(&self, model: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM document
             WHERE embedding_model = $1
               AND centroid IS NOT NULL
               AND total_characters IS NOT NULL",
        )
        .bind(model)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(count.max(0) as u64)
    }
}
