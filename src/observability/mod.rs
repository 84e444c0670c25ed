// src/observability/mod.rs
//! Diagnostics for the tracer itself
//!
//! - **Tracing**: `tracing-subscriber` fmt layer with `EnvFilter`
//! - **Metrics**: counters emitted through the `metrics` facade
//!
//! The crate never installs a metrics exporter. Counters are no-ops until the
//! embedding application installs a recorder.

use crate::utils::config::LoggingConfig;
use crate::utils::errors::{Result, TraceError};
use tracing_subscriber::EnvFilter;

pub const EVENTS_BEGUN: &str = "dbtrace_events_begun_total";
pub const EVENTS_COMPLETED: &str = "dbtrace_events_completed_total";
pub const EVENTS_ABANDONED: &str = "dbtrace_events_abandoned_total";
pub const UNMATCHED_COMPLETIONS: &str = "dbtrace_unmatched_completions_total";
pub const RECORDS_WRITTEN: &str = "dbtrace_records_written_total";
pub const RECORDS_DROPPED: &str = "dbtrace_records_dropped_total";

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TraceError::ConfigError(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| TraceError::ConfigError(format!("Failed to install subscriber: {}", e)))
}
