// src/recording/sink.rs
//! Persistence sinks for finalized event records
//!
//! - **FileSink**: append-only JSON lines file, opened on first write
//! - **MemorySink**: keeps records in memory, for tests and embedding
//!
//! Sinks never return errors to the caller. A record that cannot be encoded
//! is dropped; a destination that cannot be created turns every later write
//! into a counted no-op.

use crate::observability::{RECORDS_DROPPED, RECORDS_WRITTEN};
use crate::recording::event::EventRecord;
use crate::utils::config::{Durability, SinkConfig};
use crate::utils::errors::{Result, TraceError};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Name collisions tolerated before the destination is declared unavailable
const MAX_NAME_ATTEMPTS: u128 = 64;

/// Destination for finalized records
pub trait EventSink: Send + Sync {
    /// Persist one record. Must not interleave with concurrent writes.
    fn write(&self, record: &EventRecord);
}

/// Sink statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Records appended to the destination
    pub written: u64,

    /// Records dropped because they could not be encoded
    pub serialization_failures: u64,

    /// Records dropped because the destination could not be created
    pub unavailable_drops: u64,

    /// Records lost to write or flush errors
    pub io_errors: u64,
}

#[derive(Debug, Default)]
struct SinkCounters {
    written: AtomicU64,
    serialization_failures: AtomicU64,
    unavailable_drops: AtomicU64,
    io_errors: AtomicU64,
}

impl SinkCounters {
    fn snapshot(&self) -> SinkStats {
        SinkStats {
            written: self.written.load(Ordering::Relaxed),
            serialization_failures: self.serialization_failures.load(Ordering::Relaxed),
            unavailable_drops: self.unavailable_drops.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
        }
    }
}

enum SinkState {
    /// Nothing written yet
    Pending,
    /// Lines go to the file unbuffered, one `write_all` each
    Open { path: PathBuf, file: File },
    /// Creation failed; stays failed for the life of the sink
    Failed,
}

/// Append-only JSON lines file sink
///
/// The file name is fixed at construction from a nanosecond timestamp, but
/// the file itself is only created by the first `write`.
pub struct FileSink {
    config: SinkConfig,
    stamp: u128,
    state: Mutex<SinkState>,
    counters: SinkCounters,
}

impl FileSink {
    /// Create a sink; no file is touched until the first record arrives
    pub fn new(config: SinkConfig) -> Self {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        Self {
            config,
            stamp,
            state: Mutex::new(SinkState::Pending),
            counters: SinkCounters::default(),
        }
    }

    /// Path of the log file, once it has been created
    pub fn path(&self) -> Option<PathBuf> {
        match &*self.state.lock() {
            SinkState::Open { path, .. } => Some(path.clone()),
            _ => None,
        }
    }

    /// Get sink statistics
    pub fn stats(&self) -> SinkStats {
        self.counters.snapshot()
    }

    fn open_destination(&self) -> SinkState {
        match self.create_file() {
            Ok((path, file)) => {
                info!("Trace log opened at {:?}", path);
                SinkState::Open { path, file }
            }
            Err(e) => {
                error!("Trace log unavailable, records will be dropped: {}", e);
                SinkState::Failed
            }
        }
    }

    fn create_file(&self) -> Result<(PathBuf, File)> {
        fs::create_dir_all(&self.config.directory).map_err(|e| {
            TraceError::StorageFailed(format!(
                "Failed to create directory {:?}: {}",
                self.config.directory, e
            ))
        })?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.config.directory.join(format!(
                "{}.{}.log",
                self.config.file_prefix,
                self.stamp + attempt
            ));

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Trace log {:?} already exists, trying next name", path);
                }
                Err(e) => {
                    return Err(TraceError::StorageFailed(format!(
                        "Failed to create {:?}: {}",
                        path, e
                    )))
                }
            }
        }

        Err(TraceError::StorageFailed(format!(
            "No free file name for prefix {:?}",
            self.config.file_prefix
        )))
    }

    fn append(file: &mut File, line: &[u8], durability: Durability) -> Result<()> {
        append_line(file, line)?;

        if durability == Durability::Sync {
            file.sync_data()
                .map_err(|e| TraceError::StorageFailed(format!("Failed to sync log: {}", e)))?;
        }

        Ok(())
    }
}

impl EventSink for FileSink {
    fn write(&self, record: &EventRecord) {
        // Encode before taking the lock
        let line = match encode_line(record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Dropping {} record: {}", record.event_type, e);
                self.counters.serialization_failures.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(RECORDS_DROPPED, "reason" => "serialization").increment(1);
                return;
            }
        };

        let mut state = self.state.lock();
        if matches!(*state, SinkState::Pending) {
            *state = self.open_destination();
        }

        let SinkState::Open { file, .. } = &mut *state else {
            self.counters.unavailable_drops.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(RECORDS_DROPPED, "reason" => "unavailable").increment(1);
            return;
        };

        match Self::append(file, &line, self.config.durability) {
            Ok(()) => {
                self.counters.written.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(RECORDS_WRITTEN).increment(1);
                debug!("Wrote {} record ({} bytes)", record.event_type, line.len());
            }
            Err(e) => {
                self.counters.io_errors.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(RECORDS_DROPPED, "reason" => "io").increment(1);
                error!("{}", e);
            }
        }
    }
}

/// Hand one encoded line to `out` without buffering
///
/// A failed write leaves nothing behind to resurface with the next record.
fn append_line<W: Write>(out: &mut W, line: &[u8]) -> Result<()> {
    out.write_all(line)
        .map_err(|e| TraceError::StorageFailed(format!("Failed to append record: {}", e)))
}

/// Encode a record as one JSON object followed by a newline
pub fn encode_line(record: &EventRecord) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(record)
        .map_err(|e| TraceError::SerializationFailed(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// Sink that keeps every record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far, in arrival order
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Remove and return everything written so far
    pub fn take(&self) -> Vec<EventRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl EventSink for MemorySink {
    fn write(&self, record: &EventRecord) {
        self.records.lock().push(record.clone());
    }
}
