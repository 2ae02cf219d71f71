//! Shared utilities for tadawul-chat
//!
//! Logging setup and small helpers for reading configuration from the
//! process environment.

pub mod env;
pub mod logging;

pub use env::EnvReader;
pub use logging::{LogFormat, init_tracing};
