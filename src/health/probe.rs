//! Upstream liveness probe.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::request::RequestTranslator;
use crate::upstream::{UpstreamError, UpstreamPool};

/// Composite health document returned by `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// "healthy" or "unhealthy".
    pub status: String,

    /// The gateway itself; always "ok" when it can answer.
    #[serde(rename = "go_server")]
    pub gateway: String,

    /// "ok" or "unreachable".
    #[serde(rename = "python_service")]
    pub upstream: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            gateway: "ok".to_string(),
            upstream: "ok".to_string(),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            gateway: "ok".to_string(),
            upstream: "unreachable".to_string(),
            error: Some(error.into()),
        }
    }
}

/// Probe the upstream's own health endpoint. Anything but a 200 is a failure.
pub async fn probe(
    pool: &UpstreamPool,
    translator: &RequestTranslator,
    request_id: &str,
) -> Result<(), UpstreamError> {
    let outbound = translator.health()?.with_request_id(request_id);
    let response = pool.fetch(outbound).await?;

    if response.status != StatusCode::OK {
        return Err(UpstreamError::BadStatus {
            status: response.status,
            body: response.body,
        });
    }
    Ok(())
}

/// Handle `GET /health`.
pub async fn check(pool: &UpstreamPool, translator: &RequestTranslator, request_id: &str) -> Response {
    match probe(pool, translator, request_id).await {
        Ok(()) => (StatusCode::OK, Json(HealthReport::healthy())).into_response(),
        Err(err) => {
            tracing::warn!(
                request_id = %request_id,
                upstream = %translator.base_url(),
                error = %err,
                "Upstream health check failed"
            );
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthReport::unhealthy(err.to_string()))).into_response()
        }
    }
}
