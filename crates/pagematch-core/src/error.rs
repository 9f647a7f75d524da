//! Error types for pagematch.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using pagematch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pagematch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Source document lacks its centroid or character totals
    #[error("Incomplete document: {0} has not finished processing")]
    IncompleteDocument(Uuid),

    /// Embedding spaces differ between the request and the document
    #[error("Embedding model mismatch: expected {expected}, found {found}")]
    ModelMismatch { expected: String, found: String },

    /// Caller aborted the search
    #[error("Search cancelled")]
    Cancelled,

    /// Alignment failure that invalidates the whole run
    #[error("Internal scoring error: {0}")]
    InternalScoring(String),

    /// Scoring failed for a single candidate (recovered inside the pipeline)
    #[error("Scoring failed for candidate {document_id}: {reason}")]
    CandidateScoring { document_id: Uuid, reason: String },

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable snake_case classification, used by callers that map errors to
    /// transport-level codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::IncompleteDocument(_) => "incomplete_document",
            Error::ModelMismatch { .. } => "model_mismatch",
            Error::Cancelled => "cancelled",
            Error::InternalScoring(_) => "internal_scoring_error",
            Error::CandidateScoring { .. } => "candidate_scoring_error",
            Error::DocumentNotFound(_) | Error::NotFound(_) => "not_found",
            Error::InvalidInput(_) => "invalid_input",
            Error::Config(_) => "config",
            Error::Database(_) => "database",
            Error::Internal(_) => "internal",
        }
    }

    /// Wrap any displayable failure as a per-candidate scoring error.
    pub fn candidate(document_id: Uuid, reason: impl std::fmt::Display) -> Self {
        Error::CandidateScoring {
            document_id,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_incomplete_document() {
        let id = Uuid::nil();
        let err = Error::IncompleteDocument(id);
        assert_eq!(
            err.to_string(),
            format!("Incomplete document: {} has not finished processing", id)
        );
    }

    #[test]
    fn test_error_display_model_mismatch() {
        let err = Error::ModelMismatch {
            expected: "nomic-embed-text".to_string(),
            found: "mxbai-embed-large".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Embedding model mismatch: expected nomic-embed-text, found mxbai-embed-large"
        );
    }

    #[test]
    fn test_error_display_cancelled() {
        assert_eq!(Error::Cancelled.to_string(), "Search cancelled");
    }

    #[test]
    fn test_error_display_internal_scoring() {
        let err = Error::InternalScoring("worker panicked".to_string());
        assert_eq!(err.to_string(), "Internal scoring error: worker panicked");
    }

    #[test]
    fn test_candidate_helper_keeps_reason() {
        let id = Uuid::new_v4();
        let err = Error::candidate(id, "chunk fetch failed");
        match &err {
            Error::CandidateScoring {
                document_id,
                reason,
            } => {
                assert_eq!(*document_id, id);
                assert_eq!(reason, "chunk fetch failed");
            }
            _ => panic!("Expected CandidateScoring error"),
        }
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_kind_classification() {
        assert_eq!(
            Error::IncompleteDocument(Uuid::nil()).kind(),
            "incomplete_document"
        );
        assert_eq!(Error::Cancelled.kind(), "cancelled");
        assert_eq!(
            Error::InternalScoring(String::new()).kind(),
            "internal_scoring_error"
        );
        assert_eq!(Error::DocumentNotFound(Uuid::nil()).kind(), "not_found");
        assert_eq!(Error::NotFound("x".to_string()).kind(), "not_found");
        assert_eq!(Error::InvalidInput("x".to_string()).kind(), "invalid_input");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(Error::Internal("test".to_string()));
        assert!(result.is_err());
    }
}
