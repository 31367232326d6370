use serde::{Deserialize, Serialize};
use shunt_core::Provider;
use std::time::Duration;

/// Root configuration — maps to `shunt.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShuntConfig {
    pub gateway: GatewayConfig,
    /// Upstream providers in priority order. At least one is required; the
    /// last entry is the fallback of last resort.
    pub providers: Vec<Provider>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Default for ShuntConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            providers: vec![],
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ── Gateway ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Access token clients must present in some header value. Empty string
    /// disables the auth check entirely.
    pub access_token: String,
    /// Upstream request timeout in seconds. For buffered requests this spans
    /// send to full response body; for streaming requests, send to headers.
    pub timeout: u64,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            timeout: 60,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before a provider's breaker opens.
    pub failure_threshold: u32,
    /// How long an open breaker suppresses a provider, in seconds.
    pub reset_timeout: u64,
    /// Probability in [0, 1] that a request probes an open provider instead
    /// of going to the first healthy one.
    pub probe_probability: f64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: 600,
            probe_probability: 0.05,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout)
    }
}

// ── Server ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. "0.0.0.0:8080".
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".into(),
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,
    /// Log format: "json" (one structured event per line) or "pretty".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "json".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({h})")?;
        }
        Ok(())
    }
}

impl ShuntConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Providers ───
        if self.providers.is_empty() {
            warnings.push(ConfigWarning {
                field: "providers".into(),
                message: "at least one provider is required".into(),
                severity: WarningSeverity::Error,
                hint: Some("add a [[providers]] entry with name, base_url, token".into()),
            });
        }
        for (i, p) in self.providers.iter().enumerate() {
            if p.name.is_empty() {
                warnings.push(ConfigWarning {
                    field: format!("providers[{i}].name"),
                    message: "provider name is empty".into(),
                    severity: WarningSeverity::Error,
                    hint: None,
                });
            }
            if p.base_url.is_empty() {
                warnings.push(ConfigWarning {
                    field: format!("providers[{i}].base_url"),
                    message: "provider base_url is empty".into(),
                    severity: WarningSeverity::Error,
                    hint: Some("set to e.g. 'https://api.example.com'".into()),
                });
            }
            if self
                .providers
                .iter()
                .take(i)
                .any(|other| other.name == p.name)
            {
                warnings.push(ConfigWarning {
                    field: format!("providers[{i}].name"),
                    message: format!("duplicate provider name '{}'", p.name),
                    severity: WarningSeverity::Error,
                    hint: Some("breaker state is keyed by name; names must be unique".into()),
                });
            }
        }

        // ── Gateway ───
        if self.gateway.access_token.is_empty() {
            warnings.push(ConfigWarning {
                field: "gateway.access_token".into(),
                message: "access token is empty — client auth is disabled".into(),
                severity: WarningSeverity::Warning,
                hint: Some("set a high-entropy token; it is also the rewrite target".into()),
            });
        }
        if self.gateway.timeout == 0 {
            warnings.push(ConfigWarning {
                field: "gateway.timeout".into(),
                message: "timeout is 0 — every upstream attempt would time out".into(),
                severity: WarningSeverity::Error,
                hint: Some("set to e.g. 60".into()),
            });
        }

        // ── Circuit breaker ───
        let cb = &self.gateway.circuit_breaker;
        if cb.failure_threshold == 0 {
            warnings.push(ConfigWarning {
                field: "gateway.circuit_breaker.failure_threshold".into(),
                message: "failure_threshold must be at least 1".into(),
                severity: WarningSeverity::Error,
                hint: None,
            });
        }
        if cb.reset_timeout == 0 {
            warnings.push(ConfigWarning {
                field: "gateway.circuit_breaker.reset_timeout".into(),
                message: "reset_timeout must be positive".into(),
                severity: WarningSeverity::Error,
                hint: Some("set to e.g. 600".into()),
            });
        }
        if !(0.0..=1.0).contains(&cb.probe_probability) {
            warnings.push(ConfigWarning {
                field: "gateway.circuit_breaker.probe_probability".into(),
                message: format!("probe_probability {} is out of range", cb.probe_probability),
                severity: WarningSeverity::Error,
                hint: Some("must be between 0.0 and 1.0".into()),
            });
        }

        // ── Server listen address ───
        if self.server.listen.is_empty() {
            warnings.push(ConfigWarning {
                field: "server.listen".into(),
                message: "listen address is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("set to e.g. '0.0.0.0:8080'".into()),
            });
        }

        // ── Logging ───
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("valid values: {}", valid_formats.join(", "))),
            });
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("valid values: {}", valid_levels.join(", "))),
            });
        }

        // Check for hard errors
        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("configuration errors: {}", errors.join("; ")));
        }

        Ok(warnings)
    }
}
