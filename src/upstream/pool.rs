//! The two outbound connection pools.
//!
//! # Responsibilities
//! - Build one hyper-util client per policy, each with its own connector and
//!   idle-connection pool
//! - Enforce the short policy's round-trip ceiling
//! - Leave the streaming policy unbounded past connection setup
//!
//! # Design Decisions
//! - The pools never share a client instance: a stalled stream holds a
//!   streaming connection and nothing else
//! - Pools are immutable after construction and shared through `Arc`
//! - No retries: a failed call surfaces immediately

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Response, StatusCode};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};

use crate::config::{PoolsConfig, ShortPoolConfig, StreamingPoolConfig};
use crate::http::request::OutboundRequest;
use crate::routing::{PoolKind, RouteClass};
use crate::upstream::connector::DeadlineConnector;
use crate::upstream::error::{error_chain, UpstreamError};

/// Client type used for every upstream call.
pub type UpstreamClient = Client<DeadlineConnector<HttpsConnector<HttpConnector>>, Body>;

/// Timeout and reuse parameters of one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPolicy {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    /// TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    pub response_header_timeout: Option<Duration>,
    /// Ceiling over the whole exchange, body included.
    pub request_timeout: Option<Duration>,
}

impl From<&ShortPoolConfig> for PoolPolicy {
    fn from(config: &ShortPoolConfig) -> Self {
        Self {
            max_idle_per_host: config.max_idle_per_host,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            response_header_timeout: config.response_header_timeout_ms.map(Duration::from_millis),
            request_timeout: Some(Duration::from_millis(config.request_timeout_ms)),
        }
    }
}

impl From<&StreamingPoolConfig> for PoolPolicy {
    fn from(config: &StreamingPoolConfig) -> Self {
        Self {
            max_idle_per_host: config.max_idle_per_host,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            response_header_timeout: None,
            request_timeout: None,
        }
    }
}

/// A fully read upstream response.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// One isolated outbound pool bound to a policy.
#[derive(Debug)]
pub struct UpstreamPool {
    kind: PoolKind,
    policy: PoolPolicy,
    client: UpstreamClient,
}

impl UpstreamPool {
    /// Build a client with its own connector and connection pool.
    pub fn new(kind: PoolKind, policy: PoolPolicy) -> Result<Self, UpstreamError> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(policy.connect_timeout));

        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| UpstreamError::Transport(e.to_string()))?
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(policy.idle_timeout)
            .pool_max_idle_per_host(policy.max_idle_per_host)
            .pool_timer(TokioTimer::new())
            .build(DeadlineConnector::new(https, policy.connect_timeout));

        tracing::info!(
            pool = ?kind,
            max_idle_per_host = policy.max_idle_per_host,
            idle_timeout = ?policy.idle_timeout,
            connect_timeout = ?policy.connect_timeout,
            response_header_timeout = ?policy.response_header_timeout,
            request_timeout = ?policy.request_timeout,
            "Upstream pool ready"
        );

        Ok(Self { kind, policy, client })
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn policy(&self) -> &PoolPolicy {
        &self.policy
    }

    /// Send a request and return once the response head has arrived.
    ///
    /// Only the response-header timeout (if any) applies; the body is left
    /// for the caller to consume at its own pace.
    pub async fn send(&self, outbound: OutboundRequest) -> Result<Response<Incoming>, UpstreamError> {
        let request = outbound
            .into_request()
            .map_err(|e| UpstreamError::InvalidRequest(e.to_string()))?;

        let pending = self.client.request(request);
        let result = match self.policy.response_header_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| UpstreamError::Timeout(limit))?,
            None => pending.await,
        };

        result.map_err(|e| UpstreamError::Unreachable(error_chain(&e)))
    }

    /// Send a request and read the whole body, within the request ceiling.
    pub async fn fetch(&self, outbound: OutboundRequest) -> Result<BufferedResponse, UpstreamError> {
        let exchange = async {
            let (parts, body) = self.send(outbound).await?.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| UpstreamError::ReadFailure(error_chain(&e)))?
                .to_bytes();

            Ok(BufferedResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        match self.policy.request_timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| UpstreamError::Timeout(limit))?,
            None => exchange.await,
        }
    }
}

/// The short and streaming pools, created once at startup.
#[derive(Debug)]
pub struct ClientPools {
    short: UpstreamPool,
    streaming: UpstreamPool,
}

impl ClientPools {
    pub fn new(short: PoolPolicy, streaming: PoolPolicy) -> Result<Self, UpstreamError> {
        Ok(Self {
            short: UpstreamPool::new(PoolKind::Short, short)?,
            streaming: UpstreamPool::new(PoolKind::Streaming, streaming)?,
        })
    }

    pub fn from_config(config: &PoolsConfig) -> Result<Self, UpstreamError> {
        Self::new((&config.short).into(), (&config.streaming).into())
    }

    pub fn short(&self) -> &UpstreamPool {
        &self.short
    }

    pub fn streaming(&self) -> &UpstreamPool {
        &self.streaming
    }

    /// The pool a route class draws its connections from.
    pub fn for_class(&self, class: RouteClass) -> &UpstreamPool {
        match class.pool_kind() {
            PoolKind::Short => &self.short,
            PoolKind::Streaming => &self.streaming,
        }
    }
}
