//! # shunt-config
//!
//! Configuration system for the Shunt gateway. Reads from `shunt.toml` and
//! environment variables — in that precedence order. The config is treated
//! as immutable after startup.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    CircuitBreakerConfig, ConfigWarning, GatewayConfig, LoggingConfig, ServerConfig, ShuntConfig,
    WarningSeverity,
};
