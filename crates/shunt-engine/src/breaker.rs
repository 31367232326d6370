//! Per-provider circuit breakers and the registry that owns them.
//!
//! A breaker counts consecutive failures and, once a threshold is reached,
//! suppresses its provider for a fixed window. The open window expires on
//! query (there is no background timer), and the expiry transition is
//! reported exactly once.

use parking_lot::Mutex;
use serde::Serialize;
use shunt_config::CircuitBreakerConfig;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Result of querying a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerQuery {
    Closed,
    Open,
    /// The open window expired on this query; the breaker reset itself.
    AutoClosed,
}

/// Consecutive-failure breaker for one provider.
///
/// `record_success` zeroes the failure count but does not clear `tripped_at`:
/// the open window is authoritative until it expires or a manual reset. A
/// successful probe therefore leaves the breaker open to `is_open`.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    failure_count: u32,
    tripped_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            failure_count: 0,
            tripped_at: None,
        }
    }

    /// Whether the breaker is open right now, without the auto-close side
    /// effect. Used internally to detect transitions.
    fn currently_open(&self) -> bool {
        matches!(self.tripped_at, Some(t) if t.elapsed() < self.reset_timeout)
    }

    /// Query the breaker. An expired open window auto-closes here: both
    /// fields are cleared atomically and `AutoClosed` is returned for this
    /// query only, so the caller can report the transition exactly once.
    pub fn query(&mut self) -> BreakerQuery {
        match self.tripped_at {
            None => BreakerQuery::Closed,
            Some(t) if t.elapsed() >= self.reset_timeout => {
                self.tripped_at = None;
                self.failure_count = 0;
                BreakerQuery::AutoClosed
            }
            Some(_) => BreakerQuery::Open,
        }
    }

    pub fn is_open(&mut self) -> bool {
        self.query() == BreakerQuery::Open
    }

    /// Count a failure. Returns true when this call tripped the breaker
    /// (closed -> open transition).
    pub fn record_failure(&mut self) -> bool {
        let was_open = self.currently_open();
        self.failure_count += 1;
        if self.failure_count >= self.failure_threshold {
            self.tripped_at = Some(Instant::now());
        }
        !was_open && self.currently_open()
    }

    /// Count a success. Clears the failure count only; see the type docs for
    /// why `tripped_at` survives.
    pub fn record_success(&mut self) {
        self.failure_count = 0;
    }

    /// Open the breaker unconditionally, restarting the window.
    pub fn trip(&mut self) {
        self.tripped_at = Some(Instant::now());
    }

    /// Close the breaker and forget its failures (manual recovery).
    pub fn reset(&mut self) {
        self.tripped_at = None;
        self.failure_count = 0;
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Time left in the open window, zero once expired, `None` if not
    /// tripped.
    pub fn remaining_time(&self) -> Option<Duration> {
        self.tripped_at
            .map(|t| self.reset_timeout.saturating_sub(t.elapsed()))
    }
}

// ── Registry ───────────────────────────────────────────────────

/// Snapshot of one breaker for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub is_open: bool,
    pub failure_count: u32,
    pub remaining_time: Option<f64>,
}

type AutoResetHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Keyed store of breakers, one per provider name, created on first
/// reference and kept for the process lifetime.
///
/// All access goes through the map mutex, which also serializes mutations on
/// any single breaker as the concurrency model requires. Breaker transitions
/// are logged here: `circuit_breaker` with `action` of `opened` or
/// `auto_reset`.
pub struct BreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
    on_auto_reset: Option<AutoResetHook>,
}

impl BreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
            on_auto_reset: None,
        }
    }

    /// Install a hook called with the provider name each time a breaker
    /// auto-closes. Used by tests to observe the transition.
    pub fn with_auto_reset_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_auto_reset = Some(Arc::new(hook));
        self
    }

    fn with_breaker<T>(&self, name: &str, f: impl FnOnce(&mut CircuitBreaker) -> T) -> T {
        let mut breakers = self.breakers.lock();
        let cb = breakers.entry(name.to_string()).or_insert_with(|| {
            CircuitBreaker::new(self.config.failure_threshold, self.config.reset_timeout())
        });
        f(cb)
    }

    /// Query a provider's breaker. An expired window auto-closes and the
    /// auto-reset event fires exactly once for the transition.
    pub fn is_open(&self, name: &str) -> bool {
        let q = self.with_breaker(name, CircuitBreaker::query);
        if q == BreakerQuery::AutoClosed {
            warn!(provider = %name, action = "auto_reset", "circuit_breaker");
            if let Some(hook) = &self.on_auto_reset {
                hook(name);
            }
        }
        q == BreakerQuery::Open
    }

    /// Count a failure against a provider. Logs the opened event when this
    /// failure tripped the breaker, and returns whether it did.
    pub fn record_failure(&self, name: &str) -> bool {
        let (tripped, count) =
            self.with_breaker(name, |cb| (cb.record_failure(), cb.failure_count()));
        if tripped {
            warn!(provider = %name, action = "opened", failure_count = count, "circuit_breaker");
        }
        tripped
    }

    pub fn record_success(&self, name: &str) {
        self.with_breaker(name, CircuitBreaker::record_success);
    }

    pub fn trip(&self, name: &str) {
        self.with_breaker(name, CircuitBreaker::trip);
    }

    pub fn reset(&self, name: &str) {
        self.with_breaker(name, CircuitBreaker::reset);
    }

    /// Close every breaker (the `/_reset_circuit` operation).
    pub fn reset_all(&self) {
        let mut breakers = self.breakers.lock();
        for cb in breakers.values_mut() {
            cb.reset();
        }
    }

    pub fn failure_count(&self, name: &str) -> u32 {
        self.with_breaker(name, |cb| cb.failure_count())
    }

    pub fn remaining_time(&self, name: &str) -> Option<Duration> {
        self.with_breaker(name, |cb| cb.remaining_time())
    }

    /// Snapshot of every breaker created so far. Querying here carries the
    /// same auto-close semantics as `is_open`.
    pub fn status(&self) -> BTreeMap<String, BreakerStatus> {
        let mut auto_closed = Vec::new();
        let snapshot: BTreeMap<String, BreakerStatus> = {
            let mut breakers = self.breakers.lock();
            breakers
                .iter_mut()
                .map(|(name, cb)| {
                    let q = cb.query();
                    if q == BreakerQuery::AutoClosed {
                        auto_closed.push(name.clone());
                    }
                    (
                        name.clone(),
                        BreakerStatus {
                            is_open: q == BreakerQuery::Open,
                            failure_count: cb.failure_count(),
                            remaining_time: cb.remaining_time().map(|d| d.as_secs_f64()),
                        },
                    )
                })
                .collect()
        };
        for name in auto_closed {
            warn!(provider = %name, action = "auto_reset", "circuit_breaker");
            if let Some(hook) = &self.on_auto_reset {
                hook(&name);
            }
        }
        snapshot
    }
}
