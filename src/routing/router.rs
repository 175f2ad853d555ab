//! Route classification.
//!
//! # Responsibilities
//! - Store the fixed public route table
//! - Classify a request (method + path) into exactly one `RouteClass`
//! - Extract and validate the identifier for routes that need one
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over a handful of routes, first match wins
//! - Explicit errors rather than a silent default route

use axum::http::Method;

use crate::routing::matcher::{ExactPathMatcher, Matcher, PathPrefixMatcher};

/// Category of an inbound request. Selects the outbound pool and relay strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Liveness probe of the gateway and upstream.
    Health,
    /// Search (`/api/search`).
    Lookup,
    /// Song metadata (`/api/song/<id>`).
    Detail,
    /// Audio byte stream (`/api/stream/<id>`).
    Stream,
}

/// Which outbound pool a route class draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Short,
    Streaming,
}

impl RouteClass {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Health => "health",
            RouteClass::Lookup => "lookup",
            RouteClass::Detail => "detail",
            RouteClass::Stream => "stream",
        }
    }

    pub fn requires_identifier(&self) -> bool {
        matches!(self, RouteClass::Detail | RouteClass::Stream)
    }

    pub fn pool_kind(&self) -> PoolKind {
        match self {
            RouteClass::Stream => PoolKind::Streaming,
            RouteClass::Health | RouteClass::Lookup | RouteClass::Detail => PoolKind::Short,
        }
    }
}

impl std::fmt::Display for RouteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("no route matches '{0}'")]
    NotFound(String),

    #[error("method {method} not allowed on {class} route")]
    MethodNotAllowed { method: Method, class: RouteClass },

    #[error("missing video ID")]
    MissingIdentifier { class: RouteClass },
}

/// A request that has been classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRoute {
    pub class: RouteClass,
    /// Opaque identifier for Detail/Stream routes, non-empty.
    pub identifier: Option<String>,
}

#[derive(Debug)]
struct Route {
    class: RouteClass,
    matcher: Box<dyn Matcher>,
}

/// The gateway's route table.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// The public API: `/health`, `/api/search`, `/api/song/<id>`, `/api/stream/<id>`.
    pub fn standard() -> Self {
        let routes = vec![
            Route {
                class: RouteClass::Health,
                matcher: Box::new(ExactPathMatcher::new("/health")),
            },
            Route {
                class: RouteClass::Lookup,
                matcher: Box::new(ExactPathMatcher::new("/api/search")),
            },
            Route {
                class: RouteClass::Detail,
                matcher: Box::new(PathPrefixMatcher::new("/api/song/")),
            },
            Route {
                class: RouteClass::Stream,
                matcher: Box::new(PathPrefixMatcher::new("/api/stream/")),
            },
        ];

        tracing::debug!(count = routes.len(), "Route table compiled");
        Self { routes }
    }

    /// Classify a request. The identifier check runs here so that no outbound
    /// call can be made for a request that lacks one.
    pub fn classify(&self, method: &Method, path: &str) -> Result<ClassifiedRoute, ClassifyError> {
        let (route, path_match) = self
            .routes
            .iter()
            .find_map(|route| route.matcher.match_path(path).map(|m| (route, m)))
            .ok_or_else(|| ClassifyError::NotFound(path.to_string()))?;

        if method != Method::GET {
            return Err(ClassifyError::MethodNotAllowed {
                method: method.clone(),
                class: route.class,
            });
        }

        let identifier = match path_match.remainder {
            Some(rest) if route.class.requires_identifier() => {
                if rest.is_empty() {
                    return Err(ClassifyError::MissingIdentifier { class: route.class });
                }
                Some(rest.to_string())
            }
            _ => None,
        };

        Ok(ClassifiedRoute {
            class: route.class,
            identifier,
        })
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}
