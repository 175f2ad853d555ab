//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use media_gateway::{ClientPools, GatewayConfig, HttpServer, Shutdown};

/// Body served by the mock for `/stream/<id>`.
pub const AUDIO: &[u8] = b"RIFF....WEBMaudio-bytes-0123456789";

/// Handle on a running mock upstream.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    /// Set once an endless stream has been dropped by the server.
    pub stream_dropped: Arc<AtomicBool>,
}

impl MockUpstream {
    /// Number of requests the upstream has received.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct MockState {
    stream_dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

async fn count_hits(State(hits): State<Arc<AtomicUsize>>, request: Request, next: Next) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    Json(json!({
        "query": params.get("q"),
        "limit": params.get("limit"),
        "count": 0,
        "results": []
    }))
}

async fn song(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "missing" => (StatusCode::NOT_FOUND, Json(json!({"detail": "Song not found"}))).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"videoId": id})).into_response()
        }
        _ => Json(json!({"videoId": id, "title": "Bohemian Rhapsody", "artists": ["Queen"]})).into_response(),
    }
}

async fn stream(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    match id.as_str() {
        "missing" => (StatusCode::NOT_FOUND, "no such video").into_response(),
        "endless" => {
            let guard = DropFlag(state.stream_dropped.clone());
            let chunks = futures_util::stream::unfold(guard, |guard| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Some((Ok::<_, io::Error>(Bytes::from_static(b"chunk")), guard))
            });
            ([(header::CONTENT_TYPE, "audio/webm")], Body::from_stream(chunks)).into_response()
        }
        _ => ([(header::CONTENT_TYPE, "audio/webm"), (header::HeaderName::from_static("x-video-id"), id.as_str())], AUDIO).into_response(),
    }
}

/// Start a well-behaved upstream implementing `/health`, `/search`,
/// `/song/{id}` and `/stream/{id}`.
pub async fn start_mock_upstream() -> MockUpstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let stream_dropped = Arc::new(AtomicBool::new(false));
    let state = MockState {
        stream_dropped: stream_dropped.clone(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/song/{id}", get(song))
        .route("/stream/{id}", get(stream))
        .with_state(state)
        .layer(middleware::from_fn_with_state(hits.clone(), count_hits));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream {
        addr,
        hits,
        stream_dropped,
    }
}

/// Start a raw upstream that announces `declared` body bytes, sends `sent`,
/// then closes the connection.
pub async fn start_truncating_upstream(content_type: &'static str, declared: usize, sent: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let head = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
                            content_type, declared
                        );
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(sent).await;
                        let _ = socket.flush().await;
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a raw upstream that answers with a chunked body, sends `sent` as a
/// single chunk, then closes without the terminating chunk.
pub async fn start_chunked_truncating_upstream(sent: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;

                let head = "HTTP/1.1 200 OK\r\nContent-Type: audio/webm\r\nTransfer-Encoding: chunked\r\n\r\n";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(format!("{:x}\r\n", sent.len()).as_bytes()).await;
                let _ = socket.write_all(sent).await;
                let _ = socket.write_all(b"\r\n").await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_millis(50)).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start an upstream whose own `/health` reports 500.
pub async fn start_unhealthy_upstream() -> SocketAddr {
    let app = Router::new().route(
        "/health",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database offline") }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Handle on a running gateway.
pub struct Gateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    server: Option<JoinHandle<io::Result<()>>>,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait up to `within` for the server to return.
    /// Returns whether it did.
    pub async fn stop(&mut self, within: Duration) -> bool {
        self.shutdown.trigger();
        let Some(server) = self.server.take() else {
            return true;
        };
        matches!(tokio::time::timeout(within, server).await, Ok(Ok(Ok(()))))
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the gateway in front of `upstream`, letting the test adjust config.
pub async fn start_gateway(upstream: SocketAddr, tweak: impl FnOnce(&mut GatewayConfig)) -> Gateway {
    let mut config = GatewayConfig::default();
    config.upstream.base_url = format!("http://{}", upstream);
    tweak(&mut config);

    let pools = Arc::new(ClientPools::from_config(&config.pools).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, pools);
    let server = tokio::spawn(server.run(listener, server_shutdown));

    Gateway {
        addr,
        shutdown,
        server: Some(server),
    }
}

/// A client that never reuses connections, so every test call is independent.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
