// src/recording/event.rs
//! Event record for one instrumented database operation
//!
//! A record is created when an operation starts, updated once when it
//! finishes (or is abandoned at shutdown) and then handed to a sink.

use crate::utils::errors::TraceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Kind of database operation being traced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Create,
    Query,
    RowQuery,
    Update,
    Delete,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::Create,
        EventType::Query,
        EventType::RowQuery,
        EventType::Update,
        EventType::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Create => "create",
            EventType::Query => "query",
            EventType::RowQuery => "row_query",
            EventType::Update => "update",
            EventType::Delete => "delete",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Links a start notification to its matching finish notification
///
/// Minted fresh for every `begin`; only meaningful to the registry that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey(Ulid);

impl CorrelationKey {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationKey {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(CorrelationKey)
            .map_err(|e| TraceError::InvalidKey(format!("{}: {}", s, e)))
    }
}

/// Fields pulled out of a call context at begin or completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedFields {
    /// SQL text as currently known
    pub query: String,

    /// Rows affected by the operation so far
    pub rows_affected: i64,

    /// Errors reported by the operation, in order
    pub errors: Vec<String>,

    /// Values of the known settings present on the call
    pub settings: BTreeMap<String, Value>,
}

/// One traced operation
///
/// Field order and names are the on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub start_time: DateTime<Utc>,

    /// Unset until the record is completed or abandoned
    pub end_time: Option<DateTime<Utc>>,

    pub query: String,

    pub event_type: EventType,

    pub rows_affected: i64,

    /// Empty means the operation succeeded
    pub errors: Vec<String>,

    /// Host-supplied identifier of the call scope
    #[serde(rename = "db_instance_id")]
    pub instance_id: String,

    #[serde(rename = "completed")]
    pub is_complete: bool,

    #[serde(rename = "settings")]
    pub vars: BTreeMap<String, Value>,
}

impl EventRecord {
    /// Build a record for an operation starting at `now`
    pub fn start(
        event_type: EventType,
        instance_id: impl Into<String>,
        fields: CapturedFields,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            start_time: now,
            end_time: None,
            query: fields.query,
            event_type,
            rows_affected: fields.rows_affected,
            errors: fields.errors,
            instance_id: instance_id.into(),
            is_complete: false,
            vars: fields.settings,
        }
    }

    /// Apply the end-side capture and mark the record complete
    ///
    /// Scalar fields are replaced; settings are merged with end-side values winning.
    pub fn finish(&mut self, fields: CapturedFields, now: DateTime<Utc>) {
        self.end_time = Some(now.max(self.start_time));
        self.is_complete = true;
        self.query = fields.query;
        self.rows_affected = fields.rows_affected;
        self.errors = fields.errors;
        self.vars.extend(fields.settings);
    }

    /// Stamp an end time on a record that never completed
    ///
    /// `is_complete` stays false so the log shows it never finished.
    pub fn abandon(&mut self, now: DateTime<Utc>) {
        self.end_time = Some(now.max(self.start_time));
    }

    /// Elapsed time, once an end time is known
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// True when the operation reported at least one error
    pub fn failed(&self) -> bool {
        !self.errors.is_empty()
    }
}
