//! In-process scenario tests for cm-relay HTTP endpoints.
//!
//! The router is driven via `tower::ServiceExt::oneshot` without binding a
//! socket. The image engine is an `httpmock` server on localhost.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use cm_relay::{config::RelayConfig, routes, state};
use http_body_util::BodyExt;
use httpmock::prelude::*;
use serde_json::json;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_router(engine_url: String) -> axum::Router {
    make_router_with(RelayConfig {
        engine_url,
        ..RelayConfig::default()
    })
}

fn make_router_with(config: RelayConfig) -> axum::Router {
    let st = Arc::new(state::AppState::new(config).expect("state"));
    routes::build_router(st)
}

/// Drive the router with one request; returns (status, headers, body).
async fn call(
    router: axum::Router,
    req: Request<axum::body::Body>,
) -> (StatusCode, axum::http::HeaderMap, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, headers, body)
}

fn parse_json(b: &bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(b).expect("body is not valid JSON")
}

fn try_on_request(body: impl Into<axum::body::Body>, request_id: Option<&str>) -> Request<axum::body::Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/try-on")
        .header("content-type", "application/json");
    if let Some(id) = request_id {
        builder = builder.header("x-request-id", id);
    }
    builder.body(body.into()).unwrap()
}

fn header_str<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_service_and_stamps_request_id() {
    let router = make_router("http://127.0.0.1:9/try-on".to_string());
    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, headers, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(&body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "cm-relay");
    assert!(json["version"].is_string());

    let id = header_str(&headers, "x-request-id");
    assert!(uuid::Uuid::parse_str(id).is_ok(), "generated id should be a uuid: {id}");
}

#[tokio::test]
async fn security_headers_are_set() {
    let router = make_router("http://127.0.0.1:9/try-on".to_string());
    let req = Request::builder()
        .uri("/api/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let (_, headers, _) = call(router, req).await;
    assert_eq!(header_str(&headers, "x-content-type-options"), "nosniff");
    assert_eq!(header_str(&headers, "x-frame-options"), "DENY");
    assert_eq!(header_str(&headers, "referrer-policy"), "no-referrer");
}

// ---------------------------------------------------------------------------
// POST /api/try-on: forwarding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_relays_engine_body_and_propagates_request_id() {
    let engine = MockServer::start_async().await;
    let engine_body = r#"{"image_url":"https://cdn.example/out.png","processing_ms":140,"request_id":"req-1","color":"Forest Veil","extra":[1,2]}"#;
    let mock = engine
        .mock_async(|when, then| {
            when.method(POST)
                .path("/try-on")
                .header("x-request-id", "req-1")
                .json_body(json!({
                    "selfie": "c2VsZmll",
                    "color": "Forest Veil",
                    "intensity": 65,
                    "request_id": "req-1",
                }));
            then.status(200)
                .header("content-type", "application/json")
                .body(engine_body);
        })
        .await;
    let router = make_router(engine.url("/try-on"));

    let req = try_on_request(
        r#"{"selfie":"c2VsZmll","color":"Forest Veil","intensity":65,"request_id":"req-1"}"#,
        Some("req-1"),
    );
    let (status, headers, body) = call(router, req).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header_str(&headers, "x-request-id"), "req-1");
    assert_eq!(header_str(&headers, "content-type"), "application/json");
    assert_eq!(&body[..], engine_body.as_bytes());
}

#[tokio::test]
async fn missing_request_id_is_generated_and_forwarded() {
    let engine = MockServer::start_async().await;
    let mock = engine
        .mock_async(|when, then| {
            when.method(POST).path("/try-on").header_exists("x-request-id");
            then.status(200).json_body(json!({ "image_url": "u" }));
        })
        .await;
    let router = make_router(engine.url("/try-on"));

    let (status, headers, _) = call(router, try_on_request(r#"{"selfie":"abc"}"#, None)).await;

    mock.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert!(uuid::Uuid::parse_str(header_str(&headers, "x-request-id")).is_ok());
}

#[tokio::test]
async fn falsy_intensity_is_forwarded_as_fifty() {
    let engine = MockServer::start_async().await;
    let mock = engine
        .mock_async(|when, then| {
            when.method(POST)
                .path("/try-on")
                .json_body(json!({
                    "selfie": "abc",
                    "color": "Soft Slate",
                    "intensity": 50,
                    "request_id": "req-zero",
                }));
            then.status(200).json_body(json!({}));
        })
        .await;

    for body in [
        r#"{"selfie":"abc","color":"Soft Slate","intensity":0}"#,
        r#"{"selfie":"abc","color":"Soft Slate"}"#,
        r#"{"selfie":"abc","color":"Soft Slate","intensity":null}"#,
    ] {
        let router = make_router(engine.url("/try-on"));
        let (status, _, _) = call(router, try_on_request(body, Some("req-zero"))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    mock.assert_hits_async(3).await;
}

// ---------------------------------------------------------------------------
// POST /api/try-on: failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn engine_error_becomes_generic_envelope() {
    let engine = MockServer::start_async().await;
    engine
        .mock_async(|when, then| {
            when.method(POST).path("/try-on");
            then.status(422)
                .json_body(json!({ "detail": "segmentation model crashed at layer 7" }));
        })
        .await;
    let router = make_router(engine.url("/try-on"));

    let (status, headers, body) =
        call(router, try_on_request(r#"{"selfie":"abc"}"#, Some("req-err"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header_str(&headers, "x-request-id"), "req-err");
    let json = parse_json(&body);
    assert_eq!(
        json,
        json!({
            "code": "INTERNAL_ERROR",
            "message": "There was a problem processing your request.",
            "request_id": "req-err",
        })
    );
    assert!(!String::from_utf8_lossy(&body).contains("segmentation"));
}

#[tokio::test]
async fn unreachable_engine_becomes_generic_envelope() {
    let router = make_router("http://127.0.0.1:9/try-on".to_string());

    let (status, _, body) = call(router, try_on_request(r#"{"selfie":"abc"}"#, Some("req-down"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json = parse_json(&body);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["request_id"], "req-down");
}

#[tokio::test]
async fn slow_engine_times_out() {
    let engine = MockServer::start_async().await;
    engine
        .mock_async(|when, then| {
            when.method(POST).path("/try-on");
            then.status(200)
                .delay(Duration::from_millis(1_000))
                .json_body(json!({ "image_url": "late" }));
        })
        .await;
    let router = make_router_with(RelayConfig {
        engine_url: engine.url("/try-on"),
        upstream_timeout: Duration::from_millis(100),
        ..RelayConfig::default()
    });

    let (status, _, body) = call(router, try_on_request(r#"{"selfie":"abc"}"#, Some("req-slow"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse_json(&body)["request_id"], "req-slow");
}

#[tokio::test]
async fn malformed_json_never_reaches_engine() {
    let engine = MockServer::start_async().await;
    let mock = engine
        .mock_async(|when, then| {
            when.any_request();
            then.status(200);
        })
        .await;
    let router = make_router(engine.url("/try-on"));

    let (status, _, body) = call(router, try_on_request("{not json", Some("req-bad"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse_json(&body)["request_id"], "req-bad");
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let engine = MockServer::start_async().await;
    let mock = engine
        .mock_async(|when, then| {
            when.any_request();
            then.status(200);
        })
        .await;
    let router = make_router_with(RelayConfig {
        engine_url: engine.url("/try-on"),
        body_limit_bytes: 1024,
        ..RelayConfig::default()
    });

    let big = format!(r#"{{"selfie":"{}"}}"#, "a".repeat(4096));
    let (status, _, body) = call(router, try_on_request(big, Some("req-big"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse_json(&body)["code"], "INTERNAL_ERROR");
    mock.assert_hits_async(0).await;
}

// ---------------------------------------------------------------------------
// Request tracing
// ---------------------------------------------------------------------------

/// `io::Write` sink shared with the test so formatted log lines can be read back.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn request_span_carries_request_id() {
    let logs = CapturedLogs::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let engine = MockServer::start_async().await;
    engine
        .mock_async(|when, then| {
            when.method(POST).path("/try-on");
            then.status(200).json_body(json!({ "image_url": "u" }));
        })
        .await;
    let router = make_router(engine.url("/try-on"));

    let (status, _, _) = call(router, try_on_request(r#"{"selfie":"abc"}"#, Some("req-traced"))).await;
    assert_eq!(status, StatusCode::OK);

    let text = logs.text();
    let response_line = text
        .lines()
        .find(|l| l.contains("finished processing request"))
        .unwrap_or_else(|| panic!("no response log line in:\n{text}"));
    assert!(response_line.contains("request_id=req-traced"), "{response_line}");
}
