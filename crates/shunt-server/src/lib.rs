//! # shunt-server
//!
//! HTTP surface of the Shunt gateway. Provides:
//!
//! - a method-agnostic catch-all that proxies everything through the engine
//! - `GET /_health` — provider list and circuit-breaker snapshot
//! - `POST /_reset_circuit` — close every breaker

use axum::{
    extract::{Request, State},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use shunt_config::ShuntConfig;
use shunt_engine::Engine;
use std::sync::Arc;
use tracing::info;

/// Build the Axum router around an engine.
pub fn build_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/_health", get(health))
        .route("/_reset_circuit", post(reset_circuit))
        .fallback(proxy)
        .with_state(engine)
}

/// Catch-all proxy handler. Every method and path not claimed by the
/// management endpoints goes through the failover engine.
async fn proxy(State(engine): State<Arc<Engine>>, req: Request) -> Response {
    engine.handle(req).await
}

async fn health(State(engine): State<Arc<Engine>>) -> Json<serde_json::Value> {
    let providers: Vec<&str> = engine
        .config()
        .providers
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    Json(serde_json::json!({
        "status": "ok",
        "providers": providers,
        "circuit_breakers": engine.breakers().status(),
    }))
}

async fn reset_circuit(State(engine): State<Arc<Engine>>) -> Json<serde_json::Value> {
    engine.breakers().reset_all();
    info!("all circuit breakers reset");
    Json(serde_json::json!({"status": "all circuit breakers reset"}))
}

/// Start the HTTP server.
pub async fn start_server(config: ShuntConfig) -> shunt_core::Result<()> {
    let listen = config.server.listen.clone();
    let engine = Arc::new(Engine::new(config)?);
    let router = build_router(engine);

    info!(listen = %listen, "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .map_err(|e| shunt_core::ShuntError::Server(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| shunt_core::ShuntError::Server(format!("server error: {e}")))?;

    Ok(())
}
