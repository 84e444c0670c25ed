// src/interception/facade.rs
//! Wiring the registry into a host's lifecycle hooks
//!
//! | Kind        | begin fires                     | complete fires                         |
//! |-------------|---------------------------------|----------------------------------------|
//! | `create`    | after `begin_transaction`       | after `commit_or_rollback_transaction` |
//! | `update`    | after `begin_transaction`       | after `commit_or_rollback_transaction` |
//! | `delete`    | after `begin_transaction`       | after `commit_or_rollback_transaction` |
//! | `query`     | before `query`                  | after `after_query`                    |
//! | `row_query` | before `row_query`              | after `row_query`                      |
//!
//! Write operations complete only once the transaction has settled, so
//! row counts and errors are final.

use crate::interception::context::{extract, stash_key, stashed_key, CallContext};
use crate::interception::hooks::{Anchor, Callback, CallbackHost, Phase};
use crate::recording::event::EventType;
use crate::recording::registry::CorrelationRegistry;
use crate::recording::sink::{EventSink, FileSink};
use crate::utils::config::TraceConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name the begin callbacks are registered under
pub const BEGIN_CALLBACK: &str = "dbtrace";

/// Name the completion callbacks are registered under
pub const COMPLETE_CALLBACK: &str = "dbtrace:complete";

/// Where begin and complete attach for one operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookBinding {
    pub kind: EventType,
    pub begin: Anchor,
    pub complete: Anchor,
}

pub const BINDINGS: [HookBinding; 5] = [
    HookBinding {
        kind: EventType::Create,
        begin: Anchor::After(Phase::BeginTransaction),
        complete: Anchor::After(Phase::CommitOrRollbackTransaction),
    },
    HookBinding {
        kind: EventType::RowQuery,
        begin: Anchor::Before(Phase::RowQuery),
        complete: Anchor::After(Phase::RowQuery),
    },
    HookBinding {
        kind: EventType::Query,
        begin: Anchor::Before(Phase::Query),
        complete: Anchor::After(Phase::AfterQuery),
    },
    HookBinding {
        kind: EventType::Update,
        begin: Anchor::After(Phase::BeginTransaction),
        complete: Anchor::After(Phase::CommitOrRollbackTransaction),
    },
    HookBinding {
        kind: EventType::Delete,
        begin: Anchor::After(Phase::BeginTransaction),
        complete: Anchor::After(Phase::CommitOrRollbackTransaction),
    },
];

/// Instrument `host`, writing records to a log file described by `config`
pub fn attach<H: CallbackHost>(host: H, config: &TraceConfig) -> (H, ShutdownHandle) {
    let sink = Arc::new(FileSink::new(config.sink.clone()));
    attach_with_sink(host, sink, config.known_settings.clone())
}

/// Instrument `host` with an explicit sink
pub fn attach_with_sink<H: CallbackHost>(
    host: H,
    sink: Arc<dyn EventSink>,
    known_settings: Vec<String>,
) -> (H, ShutdownHandle) {
    let registry = Arc::new(CorrelationRegistry::new(sink));
    attach_registry(host, registry, known_settings)
}

/// Instrument `host` with an existing registry
pub fn attach_registry<H: CallbackHost>(
    mut host: H,
    registry: Arc<CorrelationRegistry>,
    known_settings: Vec<String>,
) -> (H, ShutdownHandle) {
    let known: Arc<[String]> = known_settings.into();

    for binding in BINDINGS {
        host.register(
            binding.kind,
            binding.begin,
            BEGIN_CALLBACK,
            begin_callback(binding.kind, Arc::clone(&registry), Arc::clone(&known)),
        );
        host.register(
            binding.kind,
            binding.complete,
            COMPLETE_CALLBACK,
            complete_callback(Arc::clone(&registry), Arc::clone(&known)),
        );
    }

    info!(
        "Tracing attached to {} operation kinds ({} known settings)",
        BINDINGS.len(),
        known.len()
    );

    (host, ShutdownHandle::new(registry))
}

fn begin_callback(kind: EventType, registry: Arc<CorrelationRegistry>, known: Arc<[String]>) -> Callback {
    Arc::new(move |ctx: &mut dyn CallContext| {
        let fields = extract(&*ctx, &known);
        let key = registry.begin(kind, ctx.instance_id(), fields);
        stash_key(ctx, &key);
    })
}

fn complete_callback(registry: Arc<CorrelationRegistry>, known: Arc<[String]>) -> Callback {
    Arc::new(move |ctx: &mut dyn CallContext| {
        let key = match stashed_key(&*ctx) {
            Ok(Some(key)) => key,
            Ok(None) => {
                debug!("Completion fired without a traced start, ignoring");
                return;
            }
            Err(e) => {
                warn!("Completion fired with unusable key, ignoring: {}", e);
                return;
            }
        };

        let fields = extract(&*ctx, &known);
        registry.complete(&key, fields);
    })
}

/// Flushes unfinished records when shut down or dropped
pub struct ShutdownHandle {
    registry: Arc<CorrelationRegistry>,
    done: bool,
}

impl ShutdownHandle {
    fn new(registry: Arc<CorrelationRegistry>) -> Self {
        Self {
            registry,
            done: false,
        }
    }

    /// The registry behind the attached callbacks
    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.registry
    }

    /// Flush every unfinished record; returns how many were written
    pub fn shutdown(mut self) -> usize {
        self.done = true;
        self.registry.shutdown()
    }

    /// Turn the handle into a plain shutdown function
    pub fn into_fn(self) -> impl FnOnce() -> usize + Send {
        move || self.shutdown()
    }
}

impl Drop for ShutdownHandle {
    fn drop(&mut self) {
        if !self.done {
            self.registry.shutdown();
        }
    }
}
