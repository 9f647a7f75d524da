//! Request handlers.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use pagematch_core::{ScoreBasis, SearchOptions, SearchResponse};
use pagematch_search::CancellationHandle;

use crate::error::ApiError;
use crate::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Per-request overrides layered on top of the engine's default options.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchOverrides {
    pub stage0_top_k: Option<usize>,
    pub stage1_top_k: Option<usize>,
    pub stage2_parallel_workers: Option<usize>,
    pub threshold: Option<f32>,
    pub score_basis: Option<ScoreBasis>,
    pub chunk_match_threshold: Option<f32>,
    pub embedding_model: Option<String>,
}

impl SearchOverrides {
    pub fn apply(self, mut options: SearchOptions) -> SearchOptions {
        if let Some(k) = self.stage0_top_k {
            options.stage0_top_k = k;
        }
        if let Some(k) = self.stage1_top_k {
            options.stage1_top_k = k;
        }
        if let Some(workers) = self.stage2_parallel_workers {
            options.stage2_parallel_workers = workers;
        }
        if let Some(threshold) = self.threshold {
            options.threshold = threshold;
        }
        if let Some(basis) = self.score_basis {
            options.score_basis = basis;
        }
        if let Some(threshold) = self.chunk_match_threshold {
            options.chunk_match_threshold = threshold;
        }
        if self.embedding_model.is_some() {
            options.embedding_model = self.embedding_model;
        }
        options
    }
}

/// `POST /api/v1/documents/:id/similar`
///
/// The body is optional; an empty body runs with the configured defaults.
pub async fn find_similar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    let overrides = if body.iter().all(u8::is_ascii_whitespace) {
        SearchOverrides::default()
    } else {
        serde_json::from_slice::<SearchOverrides>(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid search options: {}", e)))?
    };
    let options = overrides.apply(state.engine.default_options().clone());
    debug!(subsystem = "api", source_id = %id, ?options, "Similarity search requested");

    let handle = CancellationHandle::new();
    let signal = handle.signal();
    let deadline = state.search_timeout.map(|timeout| spawn_deadline(handle, timeout));

    let outcome = state.engine.search_with_cancel(id, &options, signal).await;
    if let Some(deadline) = deadline {
        deadline.abort();
    }

    Ok(Json(outcome?))
}

/// Cancel the search once `timeout` elapses.
fn spawn_deadline(handle: CancellationHandle, timeout: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        handle.cancel();
    })
}
