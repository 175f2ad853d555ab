//! Buffered relay for JSON routes.
//!
//! The upstream body is read to completion under the short pool's ceiling
//! before a status line is produced, so a failed read can still become a
//! clean 500 with no partial JSON.

use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;
use crate::http::request::OutboundRequest;
use crate::relay::{RelayContext, RelayResult};
use crate::upstream::UpstreamPool;

const JSON: &str = "application/json";

pub async fn relay(pool: &UpstreamPool, outbound: OutboundRequest, ctx: &RelayContext) -> Response {
    let (response, result) = match pool.fetch(outbound).await {
        Ok(upstream) => {
            if !upstream.status.is_success() {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    status = upstream.status.as_u16(),
                    "Passing through upstream error status"
                );
            }
            let result = RelayResult::completed(upstream.status, upstream.body.len() as u64);
            let response = (upstream.status, [(header::CONTENT_TYPE, JSON)], upstream.body).into_response();
            (response, result)
        }
        Err(err) => {
            let err = GatewayError::Upstream(err);
            let result = RelayResult::failed(err.status(), 0, err.to_string());
            (err.into_response(), result)
        }
    };

    result.report(ctx);
    response
}
