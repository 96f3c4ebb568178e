// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot; the
// upstream is a wiremock server (or absent entirely for gate tests).
//
// Covered:
// - gate: X-Api-Key / ?token= acceptance and rejection, no upstream calls on 401
// - GET /health
// - 404 fallback
// - GET /api/ce_open_needs stub payload shape

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`
use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

use boond_missions_proxy::{create_router, AppState, ProxyConfig};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

const SECRET: &str = "abc";

/// Build the same Router the binary uses, pointed at the given upstream.
fn test_router(upstream: &str) -> Router {
    create_router(AppState::new(ProxyConfig::for_tests(upstream, SECRET)))
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    String::from_utf8(bytes).expect("utf8")
}

#[tokio::test]
async fn health_returns_200_ok() {
    let app = test_router("http://127.0.0.1:9"); // never called

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
}

#[tokio::test]
async fn unknown_path_is_404_plain_text() {
    let app = test_router("http://127.0.0.1:9");

    let req = Request::builder()
        .uri("/api/nope")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(resp).await, "Not found");
}

#[tokio::test]
async fn missing_or_wrong_secret_is_401_and_no_upstream_call() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let app = test_router(&upstream.uri());

    // No secret at all.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/open_missions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(resp).await, "Unauthorized");

    // Wrong query secret.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/open_missions?token=wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Wrong header secret on the stub endpoint too.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/ce_open_needs")
                .header("X-Api-Key", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // The mocked upstream must have seen zero requests.
    let seen = upstream.received_requests().await.unwrap();
    assert!(seen.is_empty(), "401 must not reach upstream: {seen:?}");
}

#[tokio::test]
async fn header_secret_authorizes_the_stub_endpoint() {
    let app = test_router("http://127.0.0.1:9");

    let req = Request::builder()
        .uri("/api/ce_open_needs")
        .header("X-Api-Key", SECRET)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v: Json = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(v["meta"]["source"], "CONNECTING-EXPERTISE-STUB");
    assert_eq!(v["data"], Json::Array(vec![]));
    assert_eq!(v["included"], Json::Array(vec![]));
}

#[tokio::test]
async fn query_secret_authorizes_open_missions() {
    // All-404 upstream: authorized request still answers 200 with the
    // expected "not configured yet" body.
    let upstream = MockServer::start().await;

    let app = test_router(&upstream.uri());
    let req = Request::builder()
        .uri(format!("/api/open_missions?token={SECRET}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let v: Json = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(v["error"], "No endpoint matched");
    assert!(v.get("attempts").is_none(), "non-debug omits the trace");
}
