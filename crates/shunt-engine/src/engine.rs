//! The failover engine: one entry point that authenticates a client request,
//! classifies it as buffered or streaming, and walks the provider priority
//! list until one upstream serves it.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, warn, Instrument};

use shunt_config::ShuntConfig;
use shunt_core::{Provider, ShuntError};

use crate::breaker::BreakerRegistry;
use crate::inspect;
use crate::select::select_provider;

/// Largest client body the gateway will buffer before forwarding.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Transport failure classification for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Timeout,
    ConnectionError,
    RequestError,
}

impl FailureKind {
    fn as_str(self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ConnectionError => "connection_error",
            FailureKind::RequestError => "request_error",
        }
    }

    fn classify(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            FailureKind::Timeout
        } else if e.is_connect() {
            FailureKind::ConnectionError
        } else {
            FailureKind::RequestError
        }
    }
}

/// Synthetic JSON error body. Field order is part of the wire contract.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn synthetic(status: StatusCode, error: &'static str, detail: Option<String>) -> Response {
    let body = serde_json::to_string(&ErrorBody { error, detail })
        .unwrap_or_else(|_| format!("{{\"error\":\"{error}\"}}"));
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_default()
}

fn upstream_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    *resp.headers_mut() = headers;
    resp
}

/// Short hex identifier binding all log events of one request together.
fn request_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn body_preview(bytes: &Bytes) -> String {
    truncate(&String::from_utf8_lossy(bytes), 200)
}

/// Per-request state, owned by the facade for the duration of one request.
struct RequestContext {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

/// The failover engine. One value owns the config snapshot, the breaker
/// registry, and the shared upstream client; the server wraps it in an
/// `Arc` and every request handler borrows it. Tests construct alternative
/// engines instead of mutating globals.
pub struct Engine {
    config: ShuntConfig,
    breakers: BreakerRegistry,
    client: reqwest::Client,
}

impl Engine {
    pub fn new(config: ShuntConfig) -> shunt_core::Result<Self> {
        if config.providers.is_empty() {
            return Err(ShuntError::Config(
                "at least one provider is required".into(),
            ));
        }
        let breakers = BreakerRegistry::new(config.gateway.circuit_breaker.clone());
        // No client-level timeout: the buffered pipeline sets one per request
        // and the streaming pipeline bounds only the header phase.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ShuntError::Server(format!("failed to build http client: {e}")))?;
        Ok(Self {
            config,
            breakers,
            client,
        })
    }

    pub fn config(&self) -> &ShuntConfig {
        &self.config
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Single entry point. Generates the request id, binds it to a span so
    /// every log event of this request carries it, then authenticates,
    /// buffers the body, and dispatches to a pipeline. Always produces a
    /// response; nothing propagates as an error.
    pub async fn handle(&self, req: Request<Body>) -> Response {
        let span = tracing::info_span!("request", req_id = %request_id());
        self.handle_inner(req).instrument(span).await
    }

    async fn handle_inner(&self, req: Request<Body>) -> Response {
        let (parts, body) = req.into_parts();

        if !inspect::check_auth(&parts.headers, &self.config.gateway.access_token) {
            warn!(reason = "invalid_token", "auth_failed");
            return synthetic(StatusCode::UNAUTHORIZED, "Unauthorized", None);
        }

        let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "failed to read client body");
                return synthetic(StatusCode::BAD_REQUEST, "Bad Request", None);
            }
        };

        let (model, stream) = inspect::parse_body(&body);
        let ctx = RequestContext {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
        };
        info!(
            method = %ctx.method,
            path = %ctx.path,
            query = ctx.query.as_deref(),
            model = model.as_deref(),
            stream,
            "request_start"
        );

        if stream {
            self.stream_request(&ctx).await
        } else {
            self.buffered_request(&ctx).await
        }
    }

    /// Selector result expanded into the full attempt order: the preferred
    /// provider first, then every remaining provider that is not suppressed.
    /// The last provider is always included; it is never suppressed.
    fn attempt_order(&self) -> Vec<(usize, bool)> {
        let providers = &self.config.providers;
        let n = providers.len();
        let sel = select_provider(
            providers,
            &self.breakers,
            self.config.gateway.circuit_breaker.probe_probability,
            &mut || rand::random::<f64>(),
        );
        let mut order = vec![(sel.index, sel.is_probe)];
        for i in 0..n {
            if i == sel.index {
                continue;
            }
            if i == n - 1 || !self.breakers.is_open(&providers[i].name) {
                order.push((i, false));
            }
        }
        order
    }

    fn target_url(&self, provider: &Provider, ctx: &RequestContext) -> String {
        match &ctx.query {
            Some(q) => format!("{}{}?{}", provider.base_url, ctx.path, q),
            None => format!("{}{}", provider.base_url, ctx.path),
        }
    }

    fn forward_headers(&self, ctx: &RequestContext, provider: &Provider) -> HeaderMap {
        inspect::replace_token(
            &inspect::filter_headers(&ctx.headers),
            &self.config.gateway.access_token,
            &provider.token,
        )
    }

    fn record_transport_failure(
        &self,
        provider: &Provider,
        last: bool,
        kind: FailureKind,
        message: &str,
        duration_ms: f64,
    ) {
        error!(
            provider = %provider.name,
            error_type = kind.as_str(),
            error_msg = %truncate(message, 500),
            duration_ms,
            "request_failure"
        );
        if !last {
            self.breakers.record_failure(&provider.name);
        }
    }

    fn record_http_failure(
        &self,
        provider: &Provider,
        last: bool,
        status: StatusCode,
        body: &Bytes,
        duration_ms: f64,
    ) {
        error!(
            provider = %provider.name,
            error_type = "http_error",
            error_msg = %body_preview(body),
            status = status.as_u16(),
            duration_ms,
            "request_failure"
        );
        if !last {
            self.breakers.record_failure(&provider.name);
        }
    }

    fn record_http_success(
        &self,
        provider: &Provider,
        is_probe: bool,
        status: StatusCode,
        duration_ms: f64,
    ) {
        self.breakers.record_success(&provider.name);
        info!(
            provider = %provider.name,
            status = status.as_u16(),
            duration_ms,
            "request_success"
        );
        if is_probe {
            info!(provider = %provider.name, "probe_success");
        }
    }

    /// Non-streaming path. Each attempt reads the full upstream response, so
    /// failover can continue right up to the moment a response is returned.
    /// Any status below 500 ends the walk; if every provider 5xx'd, the last
    /// 5xx is replayed verbatim; otherwise the 502 is synthetic.
    async fn buffered_request(&self, ctx: &RequestContext) -> Response {
        let providers = &self.config.providers;
        let n = providers.len();
        let mut last_response: Option<(StatusCode, HeaderMap, Bytes)> = None;
        let mut last_error: Option<String> = None;

        for (attempt, (i, is_probe)) in self.attempt_order().into_iter().enumerate() {
            let provider = &providers[i];
            let last = i == n - 1;
            let url = self.target_url(provider, ctx);
            if is_probe {
                info!(provider = %provider.name, "probe_attempt");
            }
            info!(
                provider = %provider.name,
                target_url = %url,
                attempt = attempt + 1,
                probe = is_probe,
                "request_forward"
            );

            let start = Instant::now();
            let result = self
                .client
                .request(ctx.method.clone(), &url)
                .headers(self.forward_headers(ctx, provider))
                .body(ctx.body.clone())
                .timeout(self.config.gateway.timeout())
                .send()
                .await;

            let resp = match result {
                Ok(resp) => resp,
                Err(e) => {
                    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                    let kind = FailureKind::classify(&e);
                    self.record_transport_failure(
                        provider,
                        last,
                        kind,
                        &e.to_string(),
                        duration_ms,
                    );
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            let status = resp.status();
            let resp_headers = inspect::filter_headers(resp.headers());
            let bytes = match resp.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                    let kind = FailureKind::classify(&e);
                    self.record_transport_failure(
                        provider,
                        last,
                        kind,
                        &e.to_string(),
                        duration_ms,
                    );
                    last_error = Some(e.to_string());
                    continue;
                }
            };
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

            if status.as_u16() < 500 {
                self.record_http_success(provider, is_probe, status, duration_ms);
                return upstream_response(status, resp_headers, Body::from(bytes));
            }

            self.record_http_failure(provider, last, status, &bytes, duration_ms);
            last_response = Some((status, resp_headers, bytes));
        }

        if let Some((status, headers, bytes)) = last_response {
            return upstream_response(status, headers, Body::from(bytes));
        }
        error!(
            error = last_error.as_deref().unwrap_or("unavailable"),
            "all_providers_failed"
        );
        synthetic(StatusCode::BAD_GATEWAY, "Bad Gateway", last_error)
    }

    /// Streaming path. The pipeline commits to the first provider whose
    /// response headers are not 5xx, because once the first body byte is
    /// forwarded the client connection is non-recoverable. Mid-stream
    /// failures after commit propagate as truncation; they are never failed
    /// over, since the upstream may already have produced side effects.
    async fn stream_request(&self, ctx: &RequestContext) -> Response {
        let providers = &self.config.providers;
        let n = providers.len();

        for (attempt, (i, is_probe)) in self.attempt_order().into_iter().enumerate() {
            let provider = &providers[i];
            let last = i == n - 1;
            let url = self.target_url(provider, ctx);
            if is_probe {
                info!(provider = %provider.name, "probe_attempt");
            }
            info!(
                provider = %provider.name,
                target_url = %url,
                attempt = attempt + 1,
                probe = is_probe,
                "request_forward"
            );

            let start = Instant::now();
            // The timeout bounds only the header phase; the body may stream
            // for arbitrarily long.
            let send = self
                .client
                .request(ctx.method.clone(), &url)
                .headers(self.forward_headers(ctx, provider))
                .body(ctx.body.clone())
                .send();
            let resp = match tokio::time::timeout(self.config.gateway.timeout(), send).await {
                Err(_) => {
                    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                    self.record_transport_failure(
                        provider,
                        last,
                        FailureKind::Timeout,
                        "timed out waiting for response headers",
                        duration_ms,
                    );
                    continue;
                }
                Ok(Err(e)) => {
                    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                    let kind = FailureKind::classify(&e);
                    self.record_transport_failure(
                        provider,
                        last,
                        kind,
                        &e.to_string(),
                        duration_ms,
                    );
                    continue;
                }
                Ok(Ok(resp)) => resp,
            };

            let status = resp.status();
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
            if status.as_u16() >= 500 {
                // Drain for the error preview; dropping the drained response
                // returns the connection.
                let bytes = resp.bytes().await.unwrap_or_default();
                self.record_http_failure(provider, last, status, &bytes, duration_ms);
                continue;
            }

            self.record_http_success(provider, is_probe, status, duration_ms);
            let resp_headers = inspect::filter_headers(resp.headers());
            // Commit: the upstream response is owned by the forwarded body
            // stream, so normal completion, client disconnect, and mid-stream
            // errors all drop it and close the upstream connection.
            return upstream_response(status, resp_headers, Body::from_stream(resp.bytes_stream()));
        }

        error!(error = "unavailable", "all_providers_failed");
        synthetic(StatusCode::BAD_GATEWAY, "Bad Gateway", None)
    }
}
