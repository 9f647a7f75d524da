//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use pagematch_core::Error;

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Failure from the search pipeline or the store
    Search(Error),
    /// Request could not be parsed
    BadRequest(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Search(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Search(err) => match err {
                Error::DocumentNotFound(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::IncompleteDocument(_) => StatusCode::CONFLICT,
                Error::ModelMismatch { .. } | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::Search(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = match self {
            ApiError::Search(err) => err.to_string(),
            ApiError::BadRequest(msg) => msg,
        };

        if status.is_server_error() {
            error!(subsystem = "api", kind, error = %message, "Request failed");
        }

        let body = Json(serde_json::json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::DocumentNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (Error::IncompleteDocument(Uuid::nil()), StatusCode::CONFLICT),
            (
                Error::ModelMismatch {
                    expected: "a".to_string(),
                    found: "b".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (Error::InvalidInput("x".to_string()), StatusCode::BAD_REQUEST),
            (Error::Cancelled, StatusCode::SERVICE_UNAVAILABLE),
            (
                Error::InternalScoring("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_bad_request_kind() {
        let err = ApiError::BadRequest("nope".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "invalid_input");
    }
}
