// src/interception/mod.rs
//! Host interception layer
//!
//! Hooks the correlation registry into a data-access layer's lifecycle:
//!
//! - **Hooks**: phase/anchor model and the host registration trait
//! - **Context**: narrow capability view of the host's per-call context
//! - **Facade**: `attach` and the shutdown handle
//!
//! # Architecture
//!
//! ```text
//! Host operation (create/query/row_query/update/delete)
//!     │
//!     ├─ begin anchor    → begin callback    → registry.begin → key stashed in context
//!     │
//!     └─ complete anchor → complete callback → key read back → registry.complete → sink
//! ```

pub mod context;
pub mod facade;
pub mod hooks;

// Re-export commonly used types
pub use context::{CallContext, ScopeContext, CORRELATION_KEY};
pub use facade::{attach, attach_registry, attach_with_sink, HookBinding, ShutdownHandle, BINDINGS};
pub use hooks::{Anchor, Callback, CallbackHost, CallbackTable, Phase};
