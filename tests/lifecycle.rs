// tests/lifecycle.rs
//! End-to-end tracing through a callback host into a log file

use dbtrace::interception::{attach, Anchor, CallbackTable, Phase, ScopeContext};
use dbtrace::recording::{EventRecord, LogReader, LogSummary};
use dbtrace::utils::config::SinkConfig;
use dbtrace::{EventType, TraceConfig};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn config_in(dir: &Path) -> TraceConfig {
    TraceConfig {
        sink: SinkConfig {
            directory: dir.to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn only_log(dir: &Path) -> PathBuf {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1, "expected exactly one log file");
    entries.remove(0)
}

/// Drive a write operation through the host phases the way a data-access layer would
fn run_write(host: &CallbackTable, kind: EventType, ctx: &mut ScopeContext, sql: &str, rows: i64) {
    host.fire(kind, Anchor::Before(Phase::BeginTransaction), ctx);
    host.fire(kind, Anchor::After(Phase::BeginTransaction), ctx);
    ctx.sql = sql.to_string();
    ctx.rows_affected = rows;
    host.fire(kind, Anchor::Before(Phase::CommitOrRollbackTransaction), ctx);
    host.fire(kind, Anchor::After(Phase::CommitOrRollbackTransaction), ctx);
}

fn run_query(host: &CallbackTable, ctx: &mut ScopeContext, sql: &str, rows: i64) {
    host.fire(EventType::Query, Anchor::Before(Phase::Query), ctx);
    ctx.sql = sql.to_string();
    host.fire(EventType::Query, Anchor::After(Phase::Query), ctx);
    ctx.rows_affected = rows;
    host.fire(EventType::Query, Anchor::Before(Phase::AfterQuery), ctx);
    host.fire(EventType::Query, Anchor::After(Phase::AfterQuery), ctx);
}

fn read(dir: &Path) -> Vec<EventRecord> {
    LogReader::open(only_log(dir)).unwrap().read_all().unwrap()
}

#[test]
fn query_produces_one_completed_record() {
    let dir = tempdir().unwrap();
    let (host, shutdown) = attach(CallbackTable::new(), &config_in(dir.path()));

    let mut ctx = ScopeContext::new("inst-1");
    run_query(&host, &mut ctx, "SELECT 1", 1);
    assert_eq!(shutdown.shutdown(), 0);

    let records = read(dir.path());
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.event_type, EventType::Query);
    assert_eq!(r.instance_id, "inst-1");
    assert_eq!(r.query, "SELECT 1");
    assert_eq!(r.rows_affected, 1);
    assert!(r.errors.is_empty());
    assert!(r.is_complete);
    assert!(r.end_time.unwrap() >= r.start_time);
}

#[test]
fn unfinished_create_is_flushed_at_shutdown() {
    let dir = tempdir().unwrap();
    let (host, shutdown) = attach(CallbackTable::new(), &config_in(dir.path()));

    let mut ctx = ScopeContext::new("inst-2");
    host.fire(EventType::Create, Anchor::After(Phase::BeginTransaction), &mut ctx);
    assert_eq!(shutdown.shutdown(), 1);

    let records = read(dir.path());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, EventType::Create);
    assert_eq!(records[0].instance_id, "inst-2");
    assert!(!records[0].is_complete);
    assert!(records[0].end_time.is_some());
}

#[test]
fn no_log_file_without_records() {
    let dir = tempdir().unwrap();
    let (_host, shutdown) = attach(CallbackTable::new(), &config_in(dir.path()));
    shutdown.shutdown();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn operation_errors_and_settings_are_recorded() {
    let dir = tempdir().unwrap();
    let (host, shutdown) = attach(CallbackTable::new(), &config_in(dir.path()));

    let mut ctx = ScopeContext::new("inst-3")
        .with_value("started_transaction", json!(true))
        .with_value("not_tracked", json!("ignored"));
    ctx.errors.push("UNIQUE constraint failed: users.email".to_string());
    run_write(&host, EventType::Update, &mut ctx, "UPDATE users SET email = ?", 0);
    shutdown.shutdown();

    let records = read(dir.path());
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert!(r.is_complete);
    assert_eq!(r.errors, vec!["UNIQUE constraint failed: users.email".to_string()]);
    assert_eq!(r.vars.get("started_transaction"), Some(&json!(true)));
    assert!(!r.vars.contains_key("not_tracked"));
    // The stashed correlation key is not a known setting
    assert!(!r.vars.contains_key("dbtrace"));
}

#[test]
fn concurrent_operations_across_kinds() {
    let dir = tempdir().unwrap();
    let (host, shutdown) = attach(CallbackTable::new(), &config_in(dir.path()));
    let host = Arc::new(host);
    let mut handles = vec![];

    for t in 0..8 {
        let h = Arc::clone(&host);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let mut ctx = ScopeContext::new(format!("inst-{}-{}", t, i));
                match i % 5 {
                    0 => run_query(&h, &mut ctx, "SELECT * FROM t", 3),
                    1 => run_write(&h, EventType::Create, &mut ctx, "INSERT INTO t VALUES (?)", 1),
                    2 => run_write(&h, EventType::Update, &mut ctx, "UPDATE t SET a = ?", 2),
                    3 => run_write(&h, EventType::Delete, &mut ctx, "DELETE FROM t", 4),
                    _ => {
                        h.fire(EventType::RowQuery, Anchor::Before(Phase::RowQuery), &mut ctx);
                        ctx.sql = "SELECT count(*) FROM t".to_string();
                        h.fire(EventType::RowQuery, Anchor::After(Phase::RowQuery), &mut ctx);
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(shutdown.registry().pending(), 0);
    assert_eq!(shutdown.shutdown(), 0);

    let records = read(dir.path());
    assert_eq!(records.len(), 200);

    let summary = LogSummary::from_records(&records);
    assert_eq!(summary.completed, 200);
    assert_eq!(summary.abandoned, 0);
    for kind in EventType::ALL {
        assert_eq!(summary.by_type[kind.as_str()], 40);
    }
    assert_eq!(summary.rows_affected, 40 * (3 + 1 + 2 + 4));
}
