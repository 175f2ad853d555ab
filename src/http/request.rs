//! Request handling and translation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Validate route parameters (`q`, `limit`)
//! - Build the outbound request for a classified route
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing and forwarded upstream
//! - All validation happens before an outbound request exists
//! - Identifiers are forwarded exactly as they appeared in the inbound path

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::routing::{ClassifiedRoute, ClassifyError, RouteClass};
use crate::upstream::UpstreamError;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const USER_AGENT: &str = concat!("media-gateway/", env!("CARGO_PKG_VERSION"));

/// Generates a v4 UUID for requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID assigned by the request-id layer.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// A request bound for the upstream. Owned by the handling task.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl OutboundRequest {
    /// A body-less GET.
    pub fn get(uri: Uri) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        Self {
            method: Method::GET,
            uri,
            headers,
        }
    }

    /// Propagate the inbound request ID to the upstream.
    pub fn with_request_id(mut self, request_id: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(request_id) {
            self.headers.insert(X_REQUEST_ID, value);
        }
        self
    }

    pub fn into_request(self) -> Result<Request<Body>, axum::http::Error> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }
        builder.body(Body::empty())
    }
}

/// Outbound request plus what it is about (query or identifier), for logs.
#[derive(Debug, Clone)]
pub struct Translation {
    pub request: OutboundRequest,
    pub subject: String,
}

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub limit: u32,
}

impl SearchParams {
    /// Parse `q` and `limit` from a raw query string. The first occurrence of
    /// each key wins.
    pub fn parse(raw_query: Option<&str>, default_limit: u32) -> Result<Self, GatewayError> {
        let mut query = None;
        let mut limit = None;
        for (key, value) in form_urlencoded::parse(raw_query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "q" if query.is_none() => query = Some(value.into_owned()),
                "limit" if limit.is_none() => limit = Some(value.into_owned()),
                _ => {}
            }
        }

        let query = query
            .filter(|q| !q.is_empty())
            .ok_or(GatewayError::MissingQuery)?;

        let limit = match limit.as_deref() {
            None | Some("") => default_limit,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(GatewayError::InvalidLimit(raw.to_string())),
            },
        };

        Ok(Self { query, limit })
    }
}

/// Builds outbound requests against the upstream base URL.
#[derive(Debug, Clone)]
pub struct RequestTranslator {
    base_url: String,
    default_limit: u32,
}

impl RequestTranslator {
    pub fn new(base_url: &str, default_limit: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_limit,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {upstream}/health`.
    pub fn health(&self) -> Result<OutboundRequest, UpstreamError> {
        self.uri("/health").map(OutboundRequest::get)
    }

    /// Build the outbound request for a Lookup, Detail or Stream route.
    pub fn translate(
        &self,
        route: &ClassifiedRoute,
        raw_query: Option<&str>,
    ) -> Result<Translation, GatewayError> {
        match route.class {
            RouteClass::Lookup => {
                let params = SearchParams::parse(raw_query, self.default_limit)?;
                let escaped: String = form_urlencoded::byte_serialize(params.query.as_bytes()).collect();
                let uri = self.uri(&format!("/search?q={}&limit={}", escaped, params.limit))?;
                Ok(Translation {
                    request: OutboundRequest::get(uri),
                    subject: params.query,
                })
            }
            RouteClass::Detail | RouteClass::Stream => {
                let identifier = route
                    .identifier
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .ok_or(ClassifyError::MissingIdentifier { class: route.class })?;
                let segment = if route.class == RouteClass::Detail { "song" } else { "stream" };
                let uri = self.uri(&format!("/{}/{}", segment, identifier))?;
                Ok(Translation {
                    request: OutboundRequest::get(uri),
                    subject: identifier.to_string(),
                })
            }
            RouteClass::Health => Ok(Translation {
                request: self.health()?,
                subject: String::new(),
            }),
        }
    }

    fn uri(&self, path_and_query: &str) -> Result<Uri, UpstreamError> {
        let target = format!("{}{}", self.base_url, path_and_query);
        target
            .parse::<Uri>()
            .map_err(|e| UpstreamError::InvalidRequest(format!("{}: {}", target, e)))
    }
}
