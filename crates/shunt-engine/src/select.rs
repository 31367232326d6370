//! Provider selection under circuit-breaker state.

use crate::breaker::BreakerRegistry;
use shunt_core::Provider;

/// Outcome of provider selection: an index into the priority list and
/// whether this pick is a recovery probe of an open breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub is_probe: bool,
}

/// Pick the provider for one request.
///
/// With probability `probe_probability` the request is sacrificed as a probe:
/// one provider whose breaker is currently open is chosen uniformly at
/// random, giving suppressed providers a trickle of traffic to prove
/// recovery. Otherwise the scan is strict priority order and the first
/// provider whose breaker is not open wins.
///
/// The last provider is the escape hatch: it never counts as open for the
/// scan (so it is always returnable) and is excluded from probe candidates
/// for the same reason.
///
/// `rng` must return uniform draws from [0, 1). It is injected so tests can
/// force both the probe gate and the candidate pick.
pub fn select_provider(
    providers: &[Provider],
    breakers: &BreakerRegistry,
    probe_probability: f64,
    rng: &mut dyn FnMut() -> f64,
) -> Selection {
    let n = providers.len();

    if n > 1 && rng() < probe_probability {
        let open: Vec<usize> = (0..n - 1)
            .filter(|&i| breakers.is_open(&providers[i].name))
            .collect();
        if !open.is_empty() {
            let pick = ((rng() * open.len() as f64) as usize).min(open.len() - 1);
            return Selection {
                index: open[pick],
                is_probe: true,
            };
        }
    }

    let index = (0..n)
        .position(|i| i == n - 1 || !breakers.is_open(&providers[i].name))
        .unwrap_or(0);
    Selection {
        index,
        is_probe: false,
    }
}
