//! # pagematch-db
//!
//! Storage layer for pagematch.
//!
//! This crate provides:
//! - Connection pool management
//! - A PostgreSQL + pgvector [`EmbeddingStore`] with an HNSW centroid index
//! - Per-query HNSW `ef_search` tuning over a TTL-cached corpus size
//! - An in-memory store for tests and small corpora
//!
//! ## Example
//!
//! ```rust,ignore
//! use pagematch_db::Database;
//!
//! let db = Database::connect("postgres://localhost/pagematch").await?;
//! let store = db.store();
//! let doc = store.get_document(id).await?;
//! ```

pub mod corpus_size;
pub mod hnsw_tuning;
pub mod memory;
pub mod pool;
pub mod store;

use std::sync::Arc;

pub use hnsw_tuning::{compute_ef, HnswTuningConfig, RecallTarget};
pub use memory::InMemoryEmbeddingStore;
pub use corpus_size::CorpusSizeCache;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use store::PgEmbeddingStore;

// Re-export core types
pub use pagematch_core::*;

/// Database handle bundling the pool and the embedding store.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Read-only embedding store used by the similarity pipeline.
    pub documents: PgEmbeddingStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            documents: PgEmbeddingStore::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Override HNSW tuning on the embedding store.
    pub fn with_tuning(mut self, tuning: HnswTuningConfig) -> Self {
        self.documents = self.documents.with_tuning(tuning);
        self
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Shared handle to the embedding store, as the search engine expects.
    pub fn store(&self) -> Arc<dyn EmbeddingStore> {
        Arc::new(self.documents.clone())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
