use serde::{Deserialize, Serialize};

/// One upstream API provider.
///
/// The configured provider list is a strict priority order: index 0 is
/// preferred, the last entry is the fallback of last resort. The fallback's
/// circuit breaker is never advanced by automatic failure recording, so it
/// always remains selectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Unique name; circuit-breaker key and log field.
    pub name: String,
    /// Base URL without a trailing slash. The client's path and query are
    /// appended verbatim.
    pub base_url: String,
    /// Upstream auth token. Substituted for the gateway access token in
    /// forwarded header values.
    pub token: String,
}

impl Provider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}
