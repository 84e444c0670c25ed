// benches/registry_bench.rs
//! Begin/complete overhead of the correlation registry

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dbtrace::recording::{CapturedFields, CorrelationRegistry, EventRecord, EventSink, EventType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts records without keeping them
#[derive(Default)]
struct CountingSink {
    written: AtomicU64,
}

impl EventSink for CountingSink {
    fn write(&self, record: &EventRecord) {
        black_box(record);
        self.written.fetch_add(1, Ordering::Relaxed);
    }
}

fn bench_begin_complete(c: &mut Criterion) {
    let registry = CorrelationRegistry::new(Arc::new(CountingSink::default()));
    let fields = CapturedFields {
        query: "SELECT id, name FROM users WHERE id = ?".to_string(),
        rows_affected: 1,
        ..Default::default()
    };

    c.bench_function("begin_complete", |b| {
        b.iter(|| {
            let key = registry.begin(EventType::Query, "bench", CapturedFields::default());
            registry.complete(black_box(&key), fields.clone())
        })
    });
}

fn bench_begin_with_backlog(c: &mut Criterion) {
    let registry = CorrelationRegistry::new(Arc::new(CountingSink::default()));
    for _ in 0..10_000 {
        registry.begin(EventType::Update, "backlog", CapturedFields::default());
    }

    c.bench_function("begin_complete_with_10k_pending", |b| {
        b.iter(|| {
            let key = registry.begin(EventType::Update, "bench", CapturedFields::default());
            registry.complete(&key, CapturedFields::default())
        })
    });
}

criterion_group!(benches, bench_begin_complete, bench_begin_with_backlog);
criterion_main!(benches);
