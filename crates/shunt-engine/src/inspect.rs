//! Request inspection: auth check, body sniffing, and the header filter and
//! token rewrite applied at the proxy boundary.

use axum::http::{HeaderMap, HeaderValue};

/// Hop-by-hop headers, never forwarded upstream or back to the client.
/// The set also covers `host`, `content-length`, and `content-encoding`;
/// the upstream client recomputes those for the rewritten request.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
    "content-encoding",
];

/// Drop hop-by-hop headers; everything else passes through untouched.
/// `HeaderName` is already lowercase, so the match is case-insensitive by
/// construction.
pub fn filter_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        if !HOP_BY_HOP.contains(&name.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Replace every occurrence of the gateway access token in header values
/// with the selected provider's token. The scan is a plain substring match
/// over all values, so any header carrying the token is rewritten, whatever
/// it is called. An empty token disables the rewrite.
pub fn replace_token(headers: &HeaderMap, old: &str, new: &str) -> HeaderMap {
    if old.is_empty() {
        return headers.clone();
    }
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        let rewritten = value
            .to_str()
            .ok()
            .filter(|s| s.contains(old))
            .and_then(|s| HeaderValue::from_str(&s.replace(old, new)).ok());
        out.append(name.clone(), rewritten.unwrap_or_else(|| value.clone()));
    }
    out
}

/// A request is authorized when the configured token appears as a substring
/// of any header value. Keys are ignored; non-UTF-8 values never match. An
/// empty token disables auth entirely.
pub fn check_auth(headers: &HeaderMap, token: &str) -> bool {
    if token.is_empty() {
        return true;
    }
    headers
        .iter()
        .any(|(_, v)| v.to_str().is_ok_and(|s| s.contains(token)))
}

/// Sniff the request body for routing. Only a JSON object yields anything:
/// `model` must be a string, and `stream` counts only as the literal boolean
/// `true`. Bad JSON, non-objects, and binary bodies are `(None, false)`.
pub fn parse_body(body: &[u8]) -> (Option<String>, bool) {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return (None, false);
    };
    let Some(obj) = value.as_object() else {
        return (None, false);
    };
    let model = obj
        .get("model")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let stream = obj.get("stream").and_then(|v| v.as_bool()) == Some(true);
    (model, stream)
}
