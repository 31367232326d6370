//! # shunt-engine
//!
//! The failover engine behind the Shunt gateway: request inspection,
//! provider selection under circuit-breaker state, and the buffered and
//! streaming forwarding pipelines. A client request is served by at most one
//! upstream response; upstream failure is hidden by walking the provider
//! priority list.

pub mod breaker;
pub mod engine;
pub mod inspect;
pub mod select;

pub use breaker::{BreakerQuery, BreakerRegistry, BreakerStatus, CircuitBreaker};
pub use engine::Engine;
pub use select::{select_provider, Selection};
