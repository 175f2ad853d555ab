//! Response relay subsystem.
//!
//! # Data Flow
//! ```text
//! Translation (OutboundRequest + subject)
//!     → RouteClass::Lookup | Detail → buffered.rs (short pool, full read, then write)
//!     → RouteClass::Stream          → streaming.rs (streaming pool, chunked copy)
//!     → RelayResult (status, bytes, terminal error) logged once per request
//! ```
//!
//! # Design Decisions
//! - Buffered relays emit nothing until the whole upstream body is in memory
//! - Streaming relays commit headers first, then copy chunks as they arrive
//! - A stream cut short is reported, never retried

pub mod buffered;
pub mod streaming;

use std::time::Instant;

use axum::http::StatusCode;
use axum::response::Response;

use crate::http::request::OutboundRequest;
use crate::observability::metrics;
use crate::routing::RouteClass;
use crate::upstream::ClientPools;

/// Per-request context carried into the relay for logging.
#[derive(Debug, Clone)]
pub struct RelayContext {
    pub request_id: String,
    pub class: RouteClass,
    /// Search query or identifier.
    pub subject: String,
    pub started: Instant,
}

/// Outcome of one relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResult {
    pub status: StatusCode,
    /// Body bytes handed to the response writer.
    pub bytes: u64,
    pub error: Option<String>,
}

impl RelayResult {
    pub fn completed(status: StatusCode, bytes: u64) -> Self {
        Self {
            status,
            bytes,
            error: None,
        }
    }

    pub fn failed(status: StatusCode, bytes: u64, error: impl Into<String>) -> Self {
        Self {
            status,
            bytes,
            error: Some(error.into()),
        }
    }

    /// Log the outcome and update metrics.
    pub fn report(&self, ctx: &RelayContext) {
        let elapsed_ms = ctx.started.elapsed().as_millis() as u64;
        match &self.error {
            None => tracing::info!(
                request_id = %ctx.request_id,
                route = %ctx.class,
                subject = %ctx.subject,
                status = self.status.as_u16(),
                bytes = self.bytes,
                elapsed_ms,
                "Relay complete"
            ),
            Some(error) => tracing::warn!(
                request_id = %ctx.request_id,
                route = %ctx.class,
                subject = %ctx.subject,
                status = self.status.as_u16(),
                bytes = self.bytes,
                elapsed_ms,
                error = %error,
                "Relay failed"
            ),
        }

        metrics::record_relay(ctx.class.as_str(), self);
    }
}

/// Forward an outbound request with the strategy its route class calls for.
pub async fn relay(pools: &ClientPools, outbound: OutboundRequest, ctx: RelayContext) -> Response {
    match ctx.class {
        RouteClass::Stream => streaming::relay(pools.streaming(), outbound, ctx).await,
        class => buffered::relay(pools.for_class(class), outbound, &ctx).await,
    }
}
