//! End-to-end tests: real gateway, mock upstreams, reqwest client.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

mod common;

/// Read a response body to its end. Returns the bytes seen and whether the
/// body ended in an error.
async fn drain(res: &mut reqwest::Response) -> (Vec<u8>, bool) {
    let mut received = Vec::new();
    loop {
        match res.chunk().await {
            Ok(Some(chunk)) => received.extend_from_slice(&chunk),
            Ok(None) => return (received, false),
            Err(_) => return (received, true),
        }
    }
}

#[tokio::test]
async fn test_health_reports_reachable_upstream() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;

    let res = common::client().get(gateway.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["go_server"], "ok");
    assert_eq!(body["python_service"], "ok");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_health_reports_unreachable_upstream() {
    let dead = common::unused_addr().await;
    let gateway = common::start_gateway(dead, |_| {}).await;

    let res = common::client().get(gateway.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["go_server"], "ok");
    assert_eq!(body["python_service"], "unreachable");
    assert!(body["error"].as_str().unwrap().contains("failed to call upstream service"));
}

#[tokio::test]
async fn test_health_reports_failing_upstream_health() {
    let upstream = common::start_unhealthy_upstream().await;
    let gateway = common::start_gateway(upstream, |_| {}).await;

    let res = common::client().get(gateway.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["go_server"], "ok");
    assert_eq!(body["python_service"], "unreachable");
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("status 500"), "{}", error);
    assert!(error.contains("database offline"), "{}", error);
}

#[tokio::test]
async fn test_search_passes_json_through_and_preserves_query() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;
    let q = "bohemian rhapsody & queen/+100%";

    let res = common::client()
        .get(gateway.url("/api/search"))
        .query(&[("q", q)])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["query"], q);
    assert_eq!(body["limit"], "20");
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_search_limit_handling() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;
    let client = common::client();

    let body: Value = client
        .get(gateway.url("/api/search?q=queen&limit="))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["limit"], "20");

    let body: Value = client
        .get(gateway.url("/api/search?q=queen&limit=5"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["limit"], "5");

    let hits_before = upstream.hits();
    let res = client
        .get(gateway.url("/api/search?q=queen&limit=five"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(upstream.hits(), hits_before);
}

#[tokio::test]
async fn test_missing_parameters_make_no_outbound_calls() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;
    let client = common::client();

    for path in ["/api/song/", "/api/stream/", "/api/search", "/api/search?q="] {
        let res = client.get(gateway.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
    }

    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_song_details_pass_through_status_and_body() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;
    let client = common::client();

    let res = client.get(gateway.url("/api/song/kJQP7kiw5Fk")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["videoId"], "kJQP7kiw5Fk");
    assert_eq!(body["artists"][0], "Queen");

    let res = client.get(gateway.url("/api/song/missing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["detail"], "Song not found");
}

#[tokio::test]
async fn test_short_policy_ceiling_fails_slow_calls() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |config| {
        config.pools.short.request_timeout_ms = 300;
    })
    .await;

    let started = std::time::Instant::now();
    let res = common::client().get(gateway.url("/api/song/slow")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(started.elapsed() < Duration::from_secs(2));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["type"], "upstream_timeout");
}

#[tokio::test]
async fn test_response_header_timeout_fails_slow_calls() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |config| {
        config.pools.short.response_header_timeout_ms = Some(200);
    })
    .await;

    let started = std::time::Instant::now();
    let res = common::client().get(gateway.url("/api/song/slow")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(started.elapsed() < Duration::from_secs(2));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["type"], "upstream_timeout");
}

#[tokio::test]
async fn test_buffered_read_failure_emits_no_partial_json() {
    let upstream = common::start_truncating_upstream("application/json", 500, br#"{"results": [{"videoId": "#).await;
    let gateway = common::start_gateway(upstream, |_| {}).await;

    let res = common::client().get(gateway.url("/api/song/abc")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = res.text().await.unwrap();
    assert!(!text.contains("results"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["error"]["type"], "relay_io_failure");
}

#[tokio::test]
async fn test_stream_forwards_audio_with_headers() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;

    let res = common::client().get(gateway.url("/api/stream/kJQP7kiw5Fk")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "audio/webm");
    assert_eq!(res.headers()["accept-ranges"], "bytes");
    assert_eq!(res.headers()["cache-control"], "no-cache");
    assert_eq!(res.headers()["x-video-id"], "kJQP7kiw5Fk");
    assert_eq!(res.bytes().await.unwrap().as_ref(), common::AUDIO);
}

#[tokio::test]
async fn test_stream_bad_status_aborts_before_body() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;

    let res = common::client().get(gateway.url("/api/stream/missing")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let text = res.text().await.unwrap();
    assert!(!text.contains("no such video"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["error"]["type"], "upstream_bad_status");
}

#[tokio::test]
async fn test_stream_unreachable_upstream_is_500() {
    let dead = common::unused_addr().await;
    let gateway = common::start_gateway(dead, |_| {}).await;

    let res = common::client().get(gateway.url("/api/stream/abc")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["type"], "upstream_unreachable");
}

#[tokio::test]
async fn test_severed_stream_delivers_exactly_the_bytes_received() {
    const SENT: &[u8] = &[7u8; 100];
    let upstream = common::start_truncating_upstream("audio/webm", 1000, SENT).await;
    let gateway = common::start_gateway(upstream, |_| {}).await;

    let mut res = common::client().get(gateway.url("/api/stream/abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (received, failed) = drain(&mut res).await;

    assert_eq!(received, SENT);
    assert!(failed, "a truncated stream must not look complete");
}

#[tokio::test]
async fn test_severed_chunked_stream_delivers_exactly_the_bytes_received() {
    const SENT: &[u8] = &[9u8; 140];
    let upstream = common::start_chunked_truncating_upstream(SENT).await;
    let gateway = common::start_gateway(upstream, |_| {}).await;

    let mut res = common::client().get(gateway.url("/api/stream/abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("content-length").is_none());

    let (received, failed) = drain(&mut res).await;

    assert_eq!(received, SENT);
    assert!(failed, "a truncated chunked stream must not look complete");
}

#[tokio::test]
async fn test_shutdown_completes_with_stream_open() {
    let upstream = common::start_mock_upstream().await;
    let mut gateway = common::start_gateway(upstream.addr, |config| {
        config.listener.shutdown_grace_secs = 1;
    })
    .await;

    let mut stream = common::client()
        .get(gateway.url("/api/stream/endless"))
        .send()
        .await
        .unwrap();
    assert!(stream.chunk().await.unwrap().is_some());

    assert!(gateway.stop(Duration::from_secs(5)).await, "server must return after the drain deadline");
}

#[tokio::test]
async fn test_shutdown_without_open_connections_is_immediate() {
    let upstream = common::start_mock_upstream().await;
    let mut gateway = common::start_gateway(upstream.addr, |_| {}).await;

    let res = common::client().get(gateway.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Default grace is 30s; an idle server must not wait for it.
    assert!(gateway.stop(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_long_stream_does_not_block_short_calls() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |config| {
        config.pools.short.request_timeout_ms = 2_000;
    })
    .await;
    let client = common::client();

    let mut stream = client.get(gateway.url("/api/stream/endless")).send().await.unwrap();
    assert_eq!(stream.status(), StatusCode::OK);
    assert!(stream.chunk().await.unwrap().is_some());

    for i in 0..5 {
        let search = client
            .get(gateway.url("/api/search"))
            .query(&[("q", format!("query {}", i))])
            .send();
        let res = tokio::time::timeout(Duration::from_secs(2), search)
            .await
            .expect("search blocked behind stream")
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        // The stream is still alive and flowing.
        assert!(stream.chunk().await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_client_disconnect_closes_upstream_stream() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;

    let mut stream = common::client()
        .get(gateway.url("/api/stream/endless"))
        .send()
        .await
        .unwrap();
    assert!(stream.chunk().await.unwrap().is_some());
    drop(stream);

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while !upstream.stream_dropped.load(std::sync::atomic::Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await;
    assert!(closed.is_ok(), "upstream stream should be released after the client leaves");
}

#[tokio::test]
async fn test_options_short_circuits_every_route() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;
    let client = common::client();

    for path in ["/health", "/api/search", "/api/song/abc", "/api/stream/abc"] {
        let res = client
            .request(reqwest::Method::OPTIONS, gateway.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        assert_eq!(res.headers()["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(res.headers()["access-control-allow-headers"], "Content-Type");
        assert!(res.bytes().await.unwrap().is_empty());
    }

    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let upstream = common::start_mock_upstream().await;
    let gateway = common::start_gateway(upstream.addr, |_| {}).await;

    let res = common::client().get(gateway.url("/api/playlists")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(upstream.hits(), 0);
}
