// src/interception/hooks.rs
//! Host lifecycle hook registration
//!
//! A host data-access layer exposes named phases for each operation kind
//! and lets callers register callbacks before or after them. [`CallbackHost`]
//! is that registration surface; [`CallbackTable`] is a ready-made host that
//! stores callbacks and fires them on request.

use crate::interception::context::CallContext;
use crate::recording::event::EventType;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Named point in the host's processing of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeginTransaction,
    CommitOrRollbackTransaction,
    Query,
    AfterQuery,
    RowQuery,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeginTransaction => "begin_transaction",
            Phase::CommitOrRollbackTransaction => "commit_or_rollback_transaction",
            Phase::Query => "query",
            Phase::AfterQuery => "after_query",
            Phase::RowQuery => "row_query",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a callback relative to a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Before(Phase),
    After(Phase),
}

/// Callback invoked by the host with the call's context
pub type Callback = Arc<dyn Fn(&mut dyn CallContext) + Send + Sync>;

/// Registration surface of a host data-access layer
pub trait CallbackHost {
    fn register_before(&mut self, kind: EventType, phase: Phase, name: &str, callback: Callback);

    fn register_after(&mut self, kind: EventType, phase: Phase, name: &str, callback: Callback);

    fn register(&mut self, kind: EventType, anchor: Anchor, name: &str, callback: Callback) {
        match anchor {
            Anchor::Before(phase) => self.register_before(kind, phase, name, callback),
            Anchor::After(phase) => self.register_after(kind, phase, name, callback),
        }
    }
}

struct Registration {
    kind: EventType,
    anchor: Anchor,
    name: String,
    callback: Callback,
}

/// In-memory callback host
///
/// Registering a name that already exists for the same kind and anchor
/// replaces the earlier callback.
#[derive(Default)]
pub struct CallbackTable {
    registrations: Vec<Registration>,
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback registered at `anchor` for `kind`, in registration order
    pub fn fire(&self, kind: EventType, anchor: Anchor, ctx: &mut dyn CallContext) -> usize {
        let mut fired = 0;
        for reg in self
            .registrations
            .iter()
            .filter(|r| r.kind == kind && r.anchor == anchor)
        {
            (reg.callback)(&mut *ctx);
            fired += 1;
        }
        fired
    }

    /// Names registered at `anchor` for `kind`
    pub fn names(&self, kind: EventType, anchor: Anchor) -> Vec<&str> {
        self.registrations
            .iter()
            .filter(|r| r.kind == kind && r.anchor == anchor)
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn insert(&mut self, kind: EventType, anchor: Anchor, name: &str, callback: Callback) {
        debug!("Registering callback {} for {} at {:?}", name, kind, anchor);

        if let Some(existing) = self
            .registrations
            .iter_mut()
            .find(|r| r.kind == kind && r.anchor == anchor && r.name == name)
        {
            existing.callback = callback;
            return;
        }

        self.registrations.push(Registration {
            kind,
            anchor,
            name: name.to_string(),
            callback,
        });
    }
}

impl CallbackHost for CallbackTable {
    fn register_before(&mut self, kind: EventType, phase: Phase, name: &str, callback: Callback) {
        self.insert(kind, Anchor::Before(phase), name, callback);
    }

    fn register_after(&mut self, kind: EventType, phase: Phase, name: &str, callback: Callback) {
        self.insert(kind, Anchor::After(phase), name, callback);
    }
}
