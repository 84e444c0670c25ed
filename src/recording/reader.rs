// src/recording/reader.rs
//! Reading trace logs back
//!
//! Parses the JSON lines written by [`FileSink`](crate::recording::sink::FileSink)
//! and aggregates them into a [`LogSummary`].

use crate::recording::event::EventRecord;
use crate::utils::errors::{Result, TraceError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Line-by-line reader over a trace log
pub struct LogReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl LogReader {
    /// Open a trace log
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            TraceError::StorageFailed(format!("Failed to open {:?}: {}", path, e))
        })?;

        debug!("Reading trace log {:?}", path);

        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    /// Read every record, failing on the first malformed line
    pub fn read_all(self) -> Result<Vec<EventRecord>> {
        self.collect()
    }
}

impl Iterator for LogReader {
    type Item = Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;

            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(TraceError::StorageFailed(format!(
                        "{:?} line {}: {}",
                        self.path, self.line_no, e
                    ))))
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&line).map_err(|e| {
                TraceError::SerializationFailed(format!(
                    "{:?} line {}: {}",
                    self.path, self.line_no, e
                ))
            }));
        }
    }
}

/// Aggregate view of a trace log
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogSummary {
    pub total: u64,
    pub completed: u64,

    /// Records flushed at shutdown without completing
    pub abandoned: u64,

    /// Records carrying at least one operation error
    pub failed: u64,

    /// Sum of row counts, saturating at the `i64` bounds
    pub rows_affected: i64,

    /// Count per event type, keyed by wire name
    pub by_type: BTreeMap<String, u64>,

    /// Mean duration of completed operations
    pub mean_duration_ms: Option<f64>,

    pub max_duration_ms: Option<f64>,
}

impl LogSummary {
    pub fn from_records(records: &[EventRecord]) -> Self {
        let mut summary = LogSummary::default();
        let mut total_ms = 0.0;
        let mut timed = 0u64;

        for record in records {
            summary.total += 1;
            *summary
                .by_type
                .entry(record.event_type.as_str().to_string())
                .or_default() += 1;

            if record.is_complete {
                summary.completed += 1;
                if let Some(duration) = record.duration() {
                    let ms = duration.num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0;
                    total_ms += ms;
                    timed += 1;
                    summary.max_duration_ms = Some(summary.max_duration_ms.map_or(ms, |m| m.max(ms)));
                }
            } else {
                summary.abandoned += 1;
            }

            if record.failed() {
                summary.failed += 1;
            }
            summary.rows_affected = summary.rows_affected.saturating_add(record.rows_affected);
        }

        if timed > 0 {
            summary.mean_duration_ms = Some(total_ms / timed as f64);
        }

        summary
    }
}
