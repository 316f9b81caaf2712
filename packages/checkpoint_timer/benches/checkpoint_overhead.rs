//! Benchmarks to measure the overhead of recording checkpoints.
//!
//! Every benchmark records checkpoints around no work at all, so the measured time is the cost
//! of the recording path itself.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use checkpoint_timer::{Engine, EngineCell, checkpoint};
use criterion::{Criterion, criterion_group, criterion_main};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("checkpoint_overhead");

    group.bench_function("baseline_empty", |b| {
        b.iter(|| {
            black_box(());
        });
    });

    for locking in [false, true] {
        let engine = Engine::builder().locking(locking).build();
        let name = if locking { "locking" } else { "unlocked" };

        group.bench_function(format!("checkpoint_{name}"), |b| {
            b.iter(|| {
                black_box(engine.checkpoint(black_box(1))).unwrap();
            });
        });

        group.bench_function(format!("scoped_{name}"), |b| {
            b.iter(|| {
                let _scope = engine.scoped(black_box(2)).unwrap();
                black_box(());
            });
        });
    }

    // Single-context mode does not look anything up in the registry map.
    let single = Engine::builder().max_contexts(0).locking(false).build();
    group.bench_function("checkpoint_single_context", |b| {
        b.iter(|| {
            black_box(single.checkpoint(black_box(1))).unwrap();
        });
    });

    let engine_cell = EngineCell::new();
    group.bench_function("checkpoint_engine_cell", |b| {
        b.iter(|| {
            black_box(checkpoint!(engine_cell, black_box(1))).unwrap();
        });
    });

    // Reporting cost after a realistic recording workload.
    let reported = Engine::builder().build();
    for _ in 0..1000 {
        for id in 0..4 {
            reported.checkpoint(id).unwrap();
        }
    }

    group.bench_function("to_report", |b| {
        b.iter(|| {
            black_box(reported.to_report().unwrap());
        });
    });

    group.finish();
}
