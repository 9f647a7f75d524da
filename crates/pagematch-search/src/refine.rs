//! Stage 1: refined ranking by best chunk-pair similarity.
//!
//! The centroid is a blurry summary of a document; two documents that share
//! a handful of pages can sit far apart by centroid yet have a chunk pair
//! that is nearly identical. Stage 1 re-ranks the Stage 0 list by the
//! maximum cosine over all (source chunk, candidate chunk) pairs.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use pagematch_core::{Chunk, EmbeddingStore, Error, Result, SimilarityCandidate, Stage};

use crate::cancellation::CancellationSignal;
use crate::similarity::SimilarityMatrix;

/// A Stage 0 candidate together with its fetched chunks.
#[derive(Debug, Clone)]
pub struct CandidateChunks {
    pub candidate: SimilarityCandidate,
    pub chunks: Vec<Chunk>,
}

/// A Stage 1 survivor.
///
/// The chunks and the pairwise similarities computed for ranking are
/// carried into Stage 2, so neither is fetched or computed twice.
#[derive(Debug, Clone)]
pub struct RefinedCandidate {
    pub candidate: SimilarityCandidate,
    pub chunks: Vec<Chunk>,
    pub similarities: SimilarityMatrix,
}

/// Highest cosine similarity between any pair of chunks; 0 when either
/// side has no chunks.
pub fn max_pair_similarity(source_chunks: &[Chunk], candidate_chunks: &[Chunk]) -> Result<f32> {
    Ok(SimilarityMatrix::compute(source_chunks, candidate_chunks)?.max())
}

/// Re-score candidates and keep the best `k1`.
///
/// Candidates from another embedding model or whose chunks cannot be
/// compared with the source's are dropped with a warning. When `k1` is at
/// least the input size this is only a re-sort.
pub fn refine_candidates(
    source_model: &str,
    source_chunks: &[Chunk],
    candidates: Vec<CandidateChunks>,
    k1: usize,
) -> Vec<RefinedCandidate> {
    let mut refined: Vec<RefinedCandidate> = Vec::with_capacity(candidates.len());

    for CandidateChunks {
        mut candidate,
        chunks,
    } in candidates
    {
        let id = candidate.document_id;
        if candidate.embedding_model != source_model {
            warn!(
                subsystem = "search",
                component = "refine",
                document_id = %id,
                model = %candidate.embedding_model,
                "Dropping candidate from another embedding model"
            );
            continue;
        }
        match SimilarityMatrix::compute(source_chunks, &chunks) {
            Ok(similarities) => {
                candidate.score = similarities.max();
                candidate.stage = Stage::Refined;
                refined.push(RefinedCandidate {
                    candidate,
                    chunks,
                    similarities,
                });
            }
            Err(e) => {
                warn!(
                    subsystem = "search",
                    component = "refine",
                    document_id = %id,
                    error = %e,
                    "Dropping candidate with incomparable chunks"
                );
            }
        }
    }

    refined.sort_by(|a, b| {
        b.candidate
            .score
            .partial_cmp(&a.candidate.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.candidate.document_id.cmp(&b.candidate.document_id))
    });
    refined.truncate(k1);
    refined
}

/// Fetch chunks for every Stage 0 candidate, at most `concurrency` at once.
///
/// A failed fetch drops that candidate; the rest carry on. The output is
/// ordered by document id whatever order the fetches finish in.
pub async fn gather_candidate_chunks(
    store: Arc<dyn EmbeddingStore>,
    candidates: Vec<SimilarityCandidate>,
    concurrency: usize,
    cancel: &CancellationSignal,
) -> Result<Vec<CandidateChunks>> {
    cancel.check()?;
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut join_set: JoinSet<(SimilarityCandidate, Result<Vec<Chunk>>)> = JoinSet::new();
    let mut cancel = cancel.clone();

    for candidate in candidates {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                join_set.abort_all();
                return Err(Error::Cancelled);
            }
            permit = semaphore.clone().acquire_owned() => permit
                .map_err(|e| Error::Internal(format!("chunk fetch pool closed: {}", e)))?,
        };
        let store = store.clone();
        join_set.spawn(async move {
            let _permit = permit;
            let chunks = store.get_chunks(candidate.document_id).await;
            (candidate, chunks)
        });
    }

    let mut gathered = Vec::with_capacity(join_set.len());
    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                join_set.abort_all();
                return Err(Error::Cancelled);
            }
            joined = join_set.join_next() => joined,
        };
        let Some(joined) = joined else {
            break;
        };

        match joined {
            Ok((candidate, Ok(chunks))) => gathered.push(CandidateChunks { candidate, chunks }),
            Ok((candidate, Err(e))) => {
                warn!(
                    subsystem = "search",
                    component = "refine",
                    document_id = %candidate.document_id,
                    error = %e,
                    "Failed to fetch candidate chunks, dropping"
                );
            }
            Err(e) => {
                join_set.abort_all();
                return Err(Error::Internal(format!("chunk fetch task failed: {}", e)));
            }
        }
    }
    gathered.sort_by_key(|g| g.candidate.document_id);

    debug!(
        subsystem = "search",
        component = "refine",
        candidate_count = gathered.len(),
        "Candidate chunks gathered"
    );
    Ok(gathered)
}
