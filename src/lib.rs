// src/lib.rs
//! dbtrace: lifecycle tracing for data-access operations
//!
//! Pairs the start and finish notifications a data-access layer fires for
//! each create, query, row query, update and delete, and writes one JSON
//! line per operation to an append-only log.
//!
//! # Architecture
//!
//! - **recording**: event records, correlation registry, sinks, log reader
//! - **interception**: host hook registration, call context, `attach`
//! - **observability**: tracing subscriber setup and metric names
//! - **utils**: configuration and errors
//!
//! # Example
//!
//! ```rust,ignore
//! use dbtrace::{attach, TraceConfig};
//!
//! let (host, shutdown) = attach(host, &TraceConfig::load()?);
//! // ... run the application ...
//! shutdown.shutdown();
//! ```
//!
//! Tracing never fails the traced operation: internal errors are logged,
//! counted and otherwise swallowed.

pub mod interception;
pub mod observability;
pub mod recording;
pub mod utils;

// Re-export commonly used types
pub use interception::{attach, CallContext, CallbackHost, ShutdownHandle};
pub use recording::{CorrelationRegistry, EventRecord, EventSink, EventType, FileSink, MemorySink};
pub use utils::config::TraceConfig;
pub use utils::errors::{Result, TraceError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
