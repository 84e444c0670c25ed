// src/recording/mod.rs
//! Event correlation and persistence
//!
//! - **Event**: the record describing one database operation
//! - **Registry**: pairs start/finish notifications by correlation key
//! - **Sink**: append-only JSON lines persistence
//! - **Reader**: parse logs back and summarize them
//!
//! # Architecture
//!
//! ```text
//! begin(kind, instance, fields) ──► key ──► stashed in call context
//!                                              │
//! complete(key, fields) ◄──────────────────────┘
//!        │
//!        ▼
//!  finalize record ──► EventSink::write ──► <prefix>.<nanos>.log
//! ```

pub mod event;
pub mod reader;
pub mod registry;
pub mod sink;

// Re-export commonly used types
pub use event::{CapturedFields, CorrelationKey, EventRecord, EventType};
pub use reader::{LogReader, LogSummary};
pub use registry::{CorrelationRegistry, RegistryStats};
pub use sink::{EventSink, FileSink, MemorySink, SinkStats};
