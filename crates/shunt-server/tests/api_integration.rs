//! HTTP API integration tests — exercise the management endpoints and the
//! catch-all proxy route.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::any;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use shunt_config::ShuntConfig;
use shunt_core::Provider;
use shunt_engine::Engine;

fn test_config(providers: Vec<Provider>) -> ShuntConfig {
    let mut c = ShuntConfig::default();
    c.gateway.access_token = "test-token".into();
    c.gateway.timeout = 5;
    c.gateway.circuit_breaker.probe_probability = 0.0;
    c.providers = providers;
    c
}

fn setup(providers: Vec<Provider>) -> (axum::Router, Arc<Engine>) {
    let engine = Arc::new(Engine::new(test_config(providers)).unwrap());
    (shunt_server::build_router(engine.clone()), engine)
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn spawn_upstream(status: StatusCode, body: &'static str) -> String {
    let app = axum::Router::new().fallback(any(move || async move { (status, body) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ── Health & reset ─────────────────────────────────────────────

#[tokio::test]
async fn test_health_endpoint() {
    let (app, engine) = setup(vec![
        Provider::new("primary", "https://api.primary.com", "sk-1"),
        Provider::new("backup", "https://api.backup.com", "sk-2"),
    ]);
    engine.breakers().trip("primary");

    let req = Request::get("/_health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["providers"], serde_json::json!(["primary", "backup"]));
    assert_eq!(json["circuit_breakers"]["primary"]["is_open"], true);
    assert!(json["circuit_breakers"]["primary"]["remaining_time"].is_number());
}

#[tokio::test]
async fn test_reset_circuit_endpoint() {
    let (app, engine) = setup(vec![
        Provider::new("primary", "https://api.primary.com", "sk-1"),
        Provider::new("backup", "https://api.backup.com", "sk-2"),
    ]);
    engine.breakers().trip("primary");
    assert!(engine.breakers().is_open("primary"));

    let req = Request::post("/_reset_circuit").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "all circuit breakers reset");
    assert!(!engine.breakers().is_open("primary"));
}

// ── Catch-all proxy ────────────────────────────────────────────

#[tokio::test]
async fn test_proxy_rejects_bad_token() {
    let (app, _) = setup(vec![Provider::new("a", "https://api.a.com", "sk-1")]);

    let req = Request::post("/v1/messages")
        .header("authorization", "Bearer wrong")
        .body(Body::from(r#"{"model":"m"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn test_proxy_forwards_to_upstream() {
    let upstream = spawn_upstream(StatusCode::OK, r#"{"ok":1}"#).await;
    let (app, _) = setup(vec![Provider::new("a", upstream, "sk-1")]);

    let req = Request::post("/v1/messages")
        .header("authorization", "Bearer test-token")
        .body(Body::from(r#"{"model":"m"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["ok"], 1);
}

#[tokio::test]
async fn test_proxy_handles_any_method() {
    let upstream = spawn_upstream(StatusCode::OK, r#"{"ok":1}"#).await;
    let (app, _) = setup(vec![Provider::new("a", upstream, "sk-1")]);

    for method in ["GET", "PUT", "DELETE", "PATCH"] {
        let req = Request::builder()
            .method(method)
            .uri("/v1/resource?x=1")
            .header("authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "method {method}");
    }
}
