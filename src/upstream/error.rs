//! Upstream call failures.

use std::time::Duration;

use axum::http::StatusCode;
use bytes::Bytes;

/// Error raised while talking to the upstream service.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Connection or TLS failure, including the connect deadline.
    #[error("failed to call upstream service: {0}")]
    Unreachable(String),

    /// The short-policy ceiling elapsed before the exchange completed.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// The upstream answered with a non-success status.
    #[error("upstream service returned status {}: {}", .status.as_u16(), String::from_utf8_lossy(.body))]
    BadStatus { status: StatusCode, body: Bytes },

    /// The upstream refused a stream; no body bytes were forwarded.
    #[error("upstream service refused stream with status {}", .0.as_u16())]
    StreamRejected(StatusCode),

    /// The response body could not be read to completion.
    #[error("failed to read upstream response: {0}")]
    ReadFailure(String),

    /// The outbound request could not be built.
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),

    /// The outbound transport could not be created.
    #[error("failed to initialise upstream transport: {0}")]
    Transport(String),
}

impl UpstreamError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Unreachable(_) => "upstream_unreachable",
            UpstreamError::Timeout(_) => "upstream_timeout",
            UpstreamError::BadStatus { .. } | UpstreamError::StreamRejected(_) => {
                "upstream_bad_status"
            }
            UpstreamError::ReadFailure(_) => "relay_io_failure",
            UpstreamError::InvalidRequest(_) => "invalid_upstream_request",
            UpstreamError::Transport(_) => "transport",
        }
    }
}

/// Render an error with its whole source chain.
///
/// hyper-util's client error prints only "client error (Connect)"; the
/// useful detail lives in the sources.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
