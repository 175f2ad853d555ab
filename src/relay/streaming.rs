//! Streaming relay for audio.
//!
//! # Responsibilities
//! - Reject non-success upstream statuses before any body byte moves
//! - Commit audio headers plus the upstream's end-to-end headers
//! - Copy the body chunk by chunk through a bounded channel
//! - Report bytes handed to the response body once it is dropped, however
//!   the transfer ends
//!
//! # Design Decisions
//! - The copy loop runs in its own task and watches for the client going
//!   away between chunks; dropping the upstream body closes the connection
//! - An upstream read error is pushed into the response body so hyper aborts
//!   the client connection instead of finishing it cleanly

use std::io;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tokio::sync::mpsc;

use crate::error::GatewayError;
use crate::http::request::OutboundRequest;
use crate::relay::{RelayContext, RelayResult};
use crate::upstream::error::error_chain;
use crate::upstream::{UpstreamError, UpstreamPool};

/// Chunks buffered between the upstream reader and the client writer.
const RELAY_CHANNEL_CAPACITY: usize = 8;

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

type Chunk = Result<Bytes, io::Error>;

pub async fn relay(pool: &UpstreamPool, outbound: OutboundRequest, ctx: RelayContext) -> Response {
    let upstream = match pool.send(outbound).await {
        Ok(response) => response,
        Err(err) => return reject(GatewayError::Upstream(err), &ctx),
    };

    let status = upstream.status();
    if !status.is_success() {
        // Dropping the response closes the upstream connection unread.
        return reject(GatewayError::Upstream(UpstreamError::StreamRejected(status)), &ctx);
    }

    let (parts, body) = upstream.into_parts();
    let headers = stream_headers(&parts.headers);

    let (tx, rx) = mpsc::channel::<Chunk>(RELAY_CHANNEL_CAPACITY);
    tokio::spawn(copy_body(body, tx));

    let delivery = Delivery::new(rx, status, ctx);
    let stream = futures_util::stream::unfold(delivery, |mut delivery| async move {
        let chunk = delivery.recv().await?;
        if chunk.is_err() {
            // One Pending before the error so hyper flushes the bytes it
            // already buffered; otherwise they die with the connection.
            tokio::task::yield_now().await;
        }
        Some((chunk, delivery))
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn reject(err: GatewayError, ctx: &RelayContext) -> Response {
    RelayResult::failed(err.status(), 0, err.to_string()).report(ctx);
    err.into_response()
}

/// Audio defaults first, then every end-to-end header the upstream sent.
fn stream_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/webm"));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    for name in upstream.keys() {
        if HOP_BY_HOP.contains(name) {
            continue;
        }
        headers.remove(name);
        for value in upstream.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// Copy upstream frames into the client channel until either side stops.
async fn copy_body(mut body: Incoming, tx: mpsc::Sender<Chunk>) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = tx.closed() => return,
            frame = body.frame() => frame,
        };

        match frame {
            None => return,
            Some(Ok(frame)) => {
                // Trailers are not forwarded.
                let Ok(data) = frame.into_data() else { continue };
                if tx.send(Ok(data)).await.is_err() {
                    return;
                }
            }
            Some(Err(err)) => {
                let _ = tx.send(Err(io::Error::other(error_chain(&err)))).await;
                return;
            }
        }
    }
}

/// Response-side end of the relay channel.
///
/// Counts only bytes handed to the response body, and reports the outcome
/// when dropped: by hyper when the body ends, or with the connection when
/// the client leaves.
struct Delivery {
    rx: mpsc::Receiver<Chunk>,
    status: StatusCode,
    ctx: RelayContext,
    bytes: u64,
    outcome: Option<Result<(), String>>,
}

impl Delivery {
    fn new(rx: mpsc::Receiver<Chunk>, status: StatusCode, ctx: RelayContext) -> Self {
        Self {
            rx,
            status,
            ctx,
            bytes: 0,
            outcome: None,
        }
    }

    async fn recv(&mut self) -> Option<Chunk> {
        if self.outcome.is_some() {
            return None;
        }
        match self.rx.recv().await {
            Some(Ok(data)) => {
                self.bytes += data.len() as u64;
                Some(Ok(data))
            }
            Some(Err(err)) => {
                self.outcome = Some(Err(format!("upstream read failed: {}", err)));
                Some(Err(err))
            }
            None => {
                self.outcome = Some(Ok(()));
                None
            }
        }
    }

    fn result(&self) -> RelayResult {
        match &self.outcome {
            Some(Ok(())) => RelayResult::completed(self.status, self.bytes),
            Some(Err(error)) => RelayResult::failed(self.status, self.bytes, error.clone()),
            None => RelayResult::failed(self.status, self.bytes, "client disconnected"),
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        self.result().report(&self.ctx);
    }
}
