//! Benchmarks for narc-scan
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_partition(c: &mut Criterion) {
    use narc_scan::scan::partition;

    c.bench_function("partition_1e9_by_64", |b| {
        b.iter(|| {
            let items = partition(black_box(1_000_000_000), black_box(64)).unwrap();
            black_box(items);
        })
    });
}

fn benchmark_worker_scan(c: &mut Criterion) {
    use narc_scan::scan::worker::scan;
    use narc_scan::scan::{is_narcissistic, WorkItem};

    let item = WorkItem {
        slot_id: 0,
        range_start: 1,
        range_end: 100_000,
    };

    c.bench_function("scan_100k", |b| {
        b.iter(|| {
            let output = scan(black_box(&item), is_narcissistic);
            black_box(output);
        })
    });
}

fn benchmark_thread_run(c: &mut Criterion) {
    use narc_scan::config::IsolationMode;
    use narc_scan::scan::{is_narcissistic, partition, run_with_mode};

    let items = partition(1_000_000, 4).unwrap();

    c.bench_function("thread_run_1m_by_4", |b| {
        b.iter(|| {
            let outcome = run_with_mode(IsolationMode::Thread, is_narcissistic, &items).unwrap();
            black_box(outcome);
        })
    });
}

criterion_group!(
    benches,
    benchmark_partition,
    benchmark_worker_scan,
    benchmark_thread_run
);
criterion_main!(benches);
