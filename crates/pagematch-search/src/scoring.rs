//! Stage 2 executor: bounded parallel scoring of Stage 1 survivors.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use uuid::Uuid;

use pagematch_core::{EmbeddingStore, Error, Result, SearchResult};

use crate::alignment::{score_candidate, SourceProfile};
use crate::cancellation::CancellationSignal;
use crate::refine::RefinedCandidate;

/// Results of a Stage 2 run. `results` is unordered.
#[derive(Debug, Clone, Default)]
pub struct Stage2Outcome {
    pub results: Vec<SearchResult>,
    /// Candidates dropped because scoring them failed
    pub failed: usize,
}

/// Score every candidate with at most `workers` running at once.
///
/// A failure for one candidate is logged and counted; it never aborts the
/// batch. Cancellation stops new launches, aborts in-flight tasks and fails
/// the whole run with `Cancelled`. A panicking worker fails the run with
/// `InternalScoring`.
pub async fn score_candidates(
    store: Arc<dyn EmbeddingStore>,
    source: Arc<SourceProfile>,
    candidates: Vec<RefinedCandidate>,
    workers: usize,
    chunk_match_threshold: f32,
    cancel: &CancellationSignal,
) -> Result<Stage2Outcome> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut join_set: JoinSet<(Uuid, Result<SearchResult>)> = JoinSet::new();
    let mut cancel = cancel.clone();

    for entry in candidates {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                join_set.abort_all();
                return Err(Error::Cancelled);
            }
            permit = semaphore.clone().acquire_owned() => permit
                .map_err(|e| Error::InternalScoring(format!("worker pool closed: {}", e)))?,
        };

        let store = store.clone();
        let source = source.clone();
        join_set.spawn(async move {
            let _permit = permit;
            let id = entry.candidate.document_id;
            let outcome = async {
                let totals = store
                    .get_document_totals(id)
                    .await
                    .map_err(|e| Error::candidate(id, e))?;
                score_candidate(
                    &source,
                    id,
                    &entry.chunks,
                    &entry.similarities,
                    totals,
                    chunk_match_threshold,
                )
            }
            .await;
            (id, outcome)
        });
    }

    let mut outcome = Stage2Outcome::default();
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
            Ok((_, Ok(result))) => outcome.results.push(result),
            Ok((id, Err(e))) => {
                outcome.failed += 1;
                warn!(
                    subsystem = "search",
                    component = "stage2",
                    document_id = %id,
                    error = %e,
                    "Candidate scoring failed, dropping"
                );
            }
            Err(e) => {
                join_set.abort_all();
                return Err(Error::InternalScoring(format!("scoring worker failed: {}", e)));
            }
        }
    }

    debug!(
        subsystem = "search",
        component = "stage2",
        scored = outcome.results.len(),
        failed = outcome.failed,
        "Stage 2 complete"
    );
    Ok(outcome)
}
