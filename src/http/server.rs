//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS)
//! - Bind server to listener
//! - Dispatch requests through classifier → translator → relay
//!
//! # Design Decisions
//! - No router-wide timeout layer: stream routes must outlive any deadline,
//!   so deadlines live in the short upstream pool instead
//! - Handlers share only read-only state (route table, translator, pools)

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::health;
use crate::http::middleware::cors_middleware;
use crate::http::request::{request_id, MakeRequestUuidV4, RequestTranslator, X_REQUEST_ID};
use crate::observability::metrics;
use crate::relay::{self, RelayContext};
use crate::routing::{RouteClass, RouteTable};
use crate::upstream::ClientPools;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub translator: Arc<RequestTranslator>,
    pub pools: Arc<ClientPools>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server. The pools are built once by the caller and
    /// shared read-only by every request.
    pub fn new(config: GatewayConfig, pools: Arc<ClientPools>) -> Self {
        let state = AppState {
            routes: Arc::new(RouteTable::standard()),
            translator: Arc::new(RequestTranslator::new(
                &config.upstream.base_url,
                config.search.default_limit,
            )),
            pools,
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .fallback(gateway_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(middleware::from_fn(cors_middleware)),
            )
    }

    /// The fully layered router, e.g. for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve connections until the shutdown signal fires. Each connection is
    /// driven by its own task.
    ///
    /// After the signal, open connections get `listener.shutdown_grace_secs`
    /// to finish. A stream can stay open forever, so once the grace period
    /// elapses (or a second signal arrives) `run` returns without them.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let grace = self.config.listener.shutdown_grace();
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = drain_rx.await;
            })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => {
                result?;
                tracing::info!("HTTP server stopped");
                return Ok(());
            }
            _ = shutdown.recv() => {}
        }

        tracing::info!(grace = ?grace, "Shutdown signal received, draining connections");
        let _ = drain_tx.send(());

        tokio::select! {
            result = &mut serve => result?,
            _ = tokio::time::sleep(grace) => {
                tracing::warn!(grace = ?grace, "Drain deadline elapsed, abandoning open connections");
            }
            Ok(()) = shutdown.recv() => {
                tracing::warn!("Second shutdown signal, abandoning open connections");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `GET /`: describes the public API. Never touches the upstream.
async fn index_handler() -> Json<serde_json::Value> {
    Json(json!({
        "service": "Media API Gateway",
        "status": "running",
        "endpoints": {
            "health": "GET /health",
            "search": "GET /api/search?q={query}&limit={limit}",
            "song": "GET /api/song/{videoId}",
            "stream": "GET /api/stream/{videoId}"
        }
    }))
}

/// Main gateway handler.
/// Classifies the route, builds the outbound request, and relays the response.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let request_id = request_id(&request);
    let path = request.uri().path().to_string();

    let route = match state.routes.classify(request.method(), &path) {
        Ok(route) => route,
        Err(err) => {
            tracing::warn!(
                request_id = %request_id,
                method = %request.method(),
                path = %path,
                error = %err,
                "Request rejected"
            );
            let response = GatewayError::from(err).into_response();
            metrics::record_request("unmatched", response.status().as_u16(), started);
            return response;
        }
    };

    let response = match route.class {
        RouteClass::Health => {
            health::check(state.pools.short(), &state.translator, &request_id).await
        }
        class => match state.translator.translate(&route, request.uri().query()) {
            Ok(translation) => {
                tracing::info!(
                    request_id = %request_id,
                    route = %class,
                    subject = %translation.subject,
                    "Forwarding request"
                );
                let ctx = RelayContext {
                    request_id: request_id.clone(),
                    class,
                    subject: translation.subject,
                    started,
                };
                let outbound = translation.request.with_request_id(&request_id);
                relay::relay(&state.pools, outbound, ctx).await
            }
            Err(err) => {
                tracing::warn!(
                    request_id = %request_id,
                    route = %class,
                    error = %err,
                    "Request rejected"
                );
                err.into_response()
            }
        },
    };

    metrics::record_request(route.class.as_str(), response.status().as_u16(), started);
    response
}
