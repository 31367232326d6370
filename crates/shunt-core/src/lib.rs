//! # shunt-core
//!
//! Core types and the error enum for the Shunt gateway. This crate defines
//! the shared vocabulary used by every other crate in the workspace.

pub mod error;
pub mod types;

pub use error::{Result, ShuntError};
pub use types::Provider;
