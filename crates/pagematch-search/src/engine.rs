//! Orchestrator tying the three funnel stages together.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use pagematch_core::{
    EmbeddingStore, Error, FunnelCounts, Result, SearchOptions, SearchResponse, SearchResult,
    Timing,
};

use crate::alignment::SourceProfile;
use crate::cancellation::CancellationSignal;
use crate::config::PipelineConfig;
use crate::prefilter::run_prefilter;
use crate::refine::{gather_candidate_chunks, refine_candidates};
use crate::scoring::score_candidates;

/// Document similarity search over an [`EmbeddingStore`].
///
/// Stage 0 narrows the corpus with the approximate centroid index, Stage 1
/// re-ranks by best chunk-pair similarity, and Stage 2 aligns chunks
/// exactly and computes character-weighted coverage scores in parallel.
#[derive(Clone)]
pub struct SimilaritySearchEngine {
    store: Arc<dyn EmbeddingStore>,
    defaults: SearchOptions,
}

impl SimilaritySearchEngine {
    /// Create an engine with built-in default options.
    pub fn new(store: Arc<dyn EmbeddingStore>) -> Self {
        Self {
            store,
            defaults: SearchOptions::default(),
        }
    }

    /// Create an engine whose defaults come from pipeline configuration.
    pub fn with_config(store: Arc<dyn EmbeddingStore>, config: PipelineConfig) -> Self {
        Self {
            store,
            defaults: config.default_options,
        }
    }

    /// Options applied when a caller has no overrides.
    pub fn default_options(&self) -> &SearchOptions {
        &self.defaults
    }

    pub fn store(&self) -> &Arc<dyn EmbeddingStore> {
        &self.store
    }

    /// Find documents similar to `source_id`.
    pub async fn search(&self, source_id: Uuid, options: &SearchOptions) -> Result<SearchResponse> {
        self.search_with_cancel(source_id, options, CancellationSignal::never())
            .await
    }

    /// Like [`search`](Self::search), aborting with `Cancelled` once
    /// `cancel` fires. No partial results are returned.
    #[instrument(
        skip(self, options, cancel),
        fields(subsystem = "search", component = "orchestrator", op = "search")
    )]
    pub async fn search_with_cancel(
        &self,
        source_id: Uuid,
        options: &SearchOptions,
        cancel: CancellationSignal,
    ) -> Result<SearchResponse> {
        options.validate()?;
        let started = Instant::now();

        let source = self.store.get_document(source_id).await?;
        if !source.is_complete() {
            return Err(Error::IncompleteDocument(source_id));
        }
        if let Some(expected) = &options.embedding_model {
            if expected != &source.embedding_model {
                return Err(Error::ModelMismatch {
                    expected: expected.clone(),
                    found: source.embedding_model.clone(),
                });
            }
        }
        cancel.check()?;

        // Stage 0
        let stage0_started = Instant::now();
        let stage0 = run_prefilter(self.store.as_ref(), &source, options.stage0_top_k).await?;
        let stage0_ms = elapsed_ms(stage0_started);
        cancel.check()?;

        // Stage 1
        let stage1_started = Instant::now();
        let stage0_count = stage0.len();
        let source_chunks = self.store.get_chunks(source_id).await?;
        let gathered = gather_candidate_chunks(
            self.store.clone(),
            stage0,
            options.stage2_parallel_workers,
            &cancel,
        )
        .await?;
        let stage1 = refine_candidates(
            &source.embedding_model,
            &source_chunks,
            gathered,
            options.stage1_top_k,
        );
        let stage1_count = stage1.len();
        let stage1_ms = elapsed_ms(stage1_started);
        debug!(
            stage0_candidates = stage0_count,
            stage1_candidates = stage1_count,
            "Stage 1 complete"
        );
        cancel.check()?;

        // Stage 2
        let stage2_started = Instant::now();
        let profile = Arc::new(SourceProfile::new(source, source_chunks)?);
        let stage2 = score_candidates(
            self.store.clone(),
            profile,
            stage1,
            options.stage2_parallel_workers,
            options.chunk_match_threshold,
            &cancel,
        )
        .await?;
        let stage2_ms = elapsed_ms(stage2_started);

        let stage2_scored = stage2.results.len();
        let mut results: Vec<SearchResult> = stage2
            .results
            .into_iter()
            .filter(|r| r.document_id != source_id)
            .filter(|r| options.includes(r))
            .collect();
        sort_results(&mut results, options);

        let funnel = FunnelCounts {
            stage0_candidates: stage0_count,
            stage1_candidates: stage1_count,
            stage2_scored,
            stage2_failed: stage2.failed,
            included: results.len(),
        };
        let timing = Timing {
            stage0_ms,
            stage1_ms,
            stage2_ms,
            total_ms: elapsed_ms(started),
        };

        info!(
            source_id = %source_id,
            result_count = results.len(),
            stage2_failed = funnel.stage2_failed,
            duration_ms = timing.total_ms as u64,
            "Similarity search complete"
        );

        Ok(SearchResponse {
            results,
            timing,
            funnel,
        })
    }
}

/// Primary score descending, document id ascending.
fn sort_results(results: &mut [SearchResult], options: &SearchOptions) {
    results.sort_by(|a, b| {
        let (pa, pb) = (
            options.score_basis.primary_score(a),
            options.score_basis.primary_score(b),
        );
        pb.partial_cmp(&pa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
