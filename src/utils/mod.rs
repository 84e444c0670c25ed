// src/utils/mod.rs
//! Shared utilities: configuration loading and the crate error type.

pub mod config;
pub mod errors;

pub use self::config::{Durability, LoggingConfig, SinkConfig, TraceConfig};
pub use self::errors::{Result, TraceError};
