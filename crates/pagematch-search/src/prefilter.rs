//! Stage 0: candidate prefilter over the approximate centroid index.

use std::cmp::Ordering;

use tracing::debug;

use pagematch_core::{
    CentroidHit, Document, EmbeddingStore, Error, Result, SimilarityCandidate, Stage,
};

/// Turn raw index hits into at most `k0` Stage 0 candidates.
///
/// Drops the source itself and any hit from another embedding space, then
/// orders by descending centroid similarity with ties broken by id.
pub fn select_prefilter_candidates(
    source: &Document,
    hits: Vec<CentroidHit>,
    k0: usize,
) -> Vec<SimilarityCandidate> {
    let mut candidates: Vec<SimilarityCandidate> = hits
        .into_iter()
        .filter(|hit| hit.document_id != source.id)
        .filter(|hit| hit.embedding_model == source.embedding_model)
        .map(|hit| SimilarityCandidate {
            document_id: hit.document_id,
            embedding_model: hit.embedding_model,
            score: hit.score,
            stage: Stage::Prefilter,
        })
        .collect();

    sort_candidates(&mut candidates);
    candidates.truncate(k0);
    candidates
}

/// Query the centroid index for the source's nearest neighbours.
pub async fn run_prefilter(
    store: &dyn EmbeddingStore,
    source: &Document,
    k0: usize,
) -> Result<Vec<SimilarityCandidate>> {
    let centroid = source
        .centroid_embedding
        .as_ref()
        .ok_or(Error::IncompleteDocument(source.id))?;

    // One extra so that dropping the source still leaves k0.
    let hits = store
        .approximate_nearest_centroids(centroid, k0.saturating_add(1), &source.embedding_model)
        .await?;
    let raw_hits = hits.len();

    let candidates = select_prefilter_candidates(source, hits, k0);
    debug!(
        subsystem = "search",
        component = "prefilter",
        source_id = %source.id,
        raw_hits,
        candidate_count = candidates.len(),
        "Stage 0 complete"
    );
    Ok(candidates)
}

/// Descending score, ascending document id.
fn sort_candidates(candidates: &mut [SimilarityCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });
}
