//! Errors surfaced at the handler boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::routing::ClassifyError;
use crate::upstream::UpstreamError;

/// Every failure a request can end in before response headers are committed.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("missing 'q' query parameter")]
    MissingQuery,

    #[error("invalid 'limit' query parameter '{0}': expected a positive integer")]
    InvalidLimit(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Classify(ClassifyError::NotFound(_)) => StatusCode::NOT_FOUND,
            GatewayError::Classify(ClassifyError::MethodNotAllowed { .. }) => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            GatewayError::Classify(ClassifyError::MissingIdentifier { .. })
            | GatewayError::MissingQuery
            | GatewayError::InvalidLimit(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(UpstreamError::BadStatus { status, .. })
            | GatewayError::Upstream(UpstreamError::StreamRejected(status)) => *status,
            GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Classify(ClassifyError::NotFound(_)) => "not_found",
            GatewayError::Classify(ClassifyError::MethodNotAllowed { .. }) => "method_not_allowed",
            GatewayError::Classify(ClassifyError::MissingIdentifier { .. }) => "missing_identifier",
            GatewayError::MissingQuery => "missing_query",
            GatewayError::InvalidLimit(_) => "invalid_limit",
            GatewayError::Upstream(err) => err.kind(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string()
            }
        }));

        (self.status(), body).into_response()
    }
}
