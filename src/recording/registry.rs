// src/recording/registry.rs
//! Correlation registry pairing start and finish notifications
//!
//! `begin` mints a key and parks an in-progress record under it. `complete`
//! takes the record back out, finalizes it and hands it to the sink.
//! `shutdown` drains whatever never completed.
//!
//! # Concurrency
//!
//! One mutex guards the map. It is held only for the insert or remove;
//! field extraction happens before the call and the sink write after the
//! lock is released. The sink serializes its own writes.
//!
//! A read/write gate orders `begin` and `complete` against `shutdown`.
//! Both hold the read side from the map access through the sink write, and
//! `shutdown` takes the write side before it drains. When `shutdown`
//! returns, every record that left the map has reached the sink.
//!
//! # Lifecycle
//!
//! ```text
//! begin ──► [pending map] ──complete──► sink (completed = true)
//!                │
//!                └──────shutdown──────► sink (completed = false)
//! ```
//!
//! Completed entries are evicted, so memory is bounded by the number of
//! operations in flight. A second `complete` for the same key finds nothing
//! and is ignored: the first completion wins.
//!
//! Once shut down the registry is closed. A later `begin` still returns a
//! key, but its record goes straight to the sink as abandoned instead of
//! waiting for a drain that will never come.

use crate::observability::{EVENTS_ABANDONED, EVENTS_BEGUN, EVENTS_COMPLETED, UNMATCHED_COMPLETIONS};
use crate::recording::event::{CapturedFields, CorrelationKey, EventRecord, EventType};
use crate::recording::sink::EventSink;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub begun: u64,
    pub completed: u64,

    /// Completions whose key was unknown or already completed
    pub unmatched: u64,

    /// Records flushed incomplete at shutdown or begun after it
    pub abandoned: u64,

    /// Records currently in flight
    pub pending: usize,
}

/// Concurrency-safe store of in-progress event records
pub struct CorrelationRegistry {
    events: Mutex<HashMap<CorrelationKey, EventRecord>>,
    sink: Arc<dyn EventSink>,
    gate: RwLock<()>,
    closed: AtomicBool,
    begun: AtomicU64,
    completed: AtomicU64,
    unmatched: AtomicU64,
    abandoned: AtomicU64,
}

impl CorrelationRegistry {
    /// Create a registry writing to `sink`
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            events: Mutex::new(HashMap::new()),
            sink,
            gate: RwLock::new(()),
            closed: AtomicBool::new(false),
            begun: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            unmatched: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
        }
    }

    /// Start tracking an operation and return its correlation key
    ///
    /// After `shutdown` the record is written immediately as abandoned and
    /// the returned key never matches a completion.
    pub fn begin(
        &self,
        event_type: EventType,
        instance_id: impl Into<String>,
        fields: CapturedFields,
    ) -> CorrelationKey {
        let key = CorrelationKey::generate();
        let now = Utc::now();
        let mut record = EventRecord::start(event_type, instance_id, fields, now);

        self.begun.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(EVENTS_BEGUN, "event_type" => event_type.as_str()).increment(1);

        let _gate = self.gate.read();
        if self.closed.load(Ordering::Acquire) {
            record.abandon(now);
            self.sink.write(&record);
            self.abandoned.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(EVENTS_ABANDONED, "event_type" => event_type.as_str()).increment(1);
            debug!("Registry closed, wrote {} event {} as abandoned", event_type, key);
            return key;
        }

        self.events.lock().insert(key, record);
        trace!("Began {} event {}", event_type, key);

        key
    }

    /// Finalize the operation tracked under `key` and write it
    ///
    /// Returns `false` when no matching start exists; nothing is written and
    /// the registry is left untouched.
    pub fn complete(&self, key: &CorrelationKey, fields: CapturedFields) -> bool {
        // Held until the record is in the sink
        let _gate = self.gate.read();
        let entry = self.events.lock().remove(key);

        let Some(mut record) = entry else {
            self.unmatched.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(UNMATCHED_COMPLETIONS).increment(1);
            debug!("Ignoring completion for unknown event {}", key);
            return false;
        };

        record.finish(fields, Utc::now());
        self.sink.write(&record);

        self.completed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(EVENTS_COMPLETED, "event_type" => record.event_type.as_str())
            .increment(1);
        trace!("Completed {} event {}", record.event_type, key);

        true
    }

    /// Flush every record that never completed
    ///
    /// Records keep `is_complete = false` but gain an end time. Waits for
    /// completions already in progress to reach the sink. Returns the number
    /// flushed; calling again flushes nothing new.
    pub fn shutdown(&self) -> usize {
        let _gate = self.gate.write();
        self.closed.store(true, Ordering::Release);

        let pending: Vec<EventRecord> = {
            let mut events = self.events.lock();
            events.drain().map(|(_, record)| record).collect()
        };

        let count = pending.len();
        let now = Utc::now();
        for mut record in pending {
            record.abandon(now);
            self.sink.write(&record);
            metrics::counter!(EVENTS_ABANDONED, "event_type" => record.event_type.as_str())
                .increment(1);
        }

        self.abandoned.fetch_add(count as u64, Ordering::Relaxed);
        info!("Trace registry shut down, flushed {} unfinished events", count);

        count
    }

    /// Whether `shutdown` has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of operations begun but not yet completed
    pub fn pending(&self) -> usize {
        self.events.lock().len()
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            begun: self.begun.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            pending: self.pending(),
        }
    }
}
