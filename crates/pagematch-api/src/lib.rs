//! # pagematch-api
//!
//! HTTP surface for the pagematch similarity engine.
//!
//! Routes:
//! - `GET /health`
//! - `POST /api/v1/documents/:id/similar`

pub mod error;
pub mod handlers;

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use pagematch_search::SimilaritySearchEngine;

pub use error::ApiError;

/// Request bodies only carry search options.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: SimilaritySearchEngine,
    /// Searches running longer than this are cancelled
    pub search_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(engine: SimilaritySearchEngine) -> Self {
        Self {
            engine,
            search_timeout: None,
        }
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = Some(timeout);
        self
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/v1/documents/:id/similar",
            post(handlers::find_similar),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
