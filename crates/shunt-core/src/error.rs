use thiserror::Error;

/// Unified error type for the Shunt gateway.
///
/// Note that the failover engine itself never surfaces one of these to a
/// client: every request path maps to an HTTP response. This enum covers
/// startup and infrastructure failures only.
#[derive(Error, Debug)]
pub enum ShuntError {
    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Server errors ──────────────────────────────────────────
    #[error("server error: {0}")]
    Server(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ShuntError>;
