//! Staging engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stagekv_bench::{keys, pick, random_value};
use stagekv_core::{Config, StagingEngine};
use tempfile::TempDir;

/// Benchmark autocommit puts (one durable apply each).
fn bench_autocommit_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("autocommit_put");

    for size in [64, 1024].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let engine = StagingEngine::open_in_memory().unwrap();
            let value = random_value(size);
            let mut i = 0u64;

            b.iter(|| {
                i += 1;
                engine
                    .put(None, format!("k{i}"), black_box(value.clone()))
                    .unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark a full transaction: begin, N staged puts, outermost commit.
fn bench_transaction_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("transaction_commit");

    for count in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let engine = StagingEngine::open_in_memory().unwrap();
            let session = engine.create_session();
            let keys = keys("txn", count);
            let value = random_value(128);

            b.iter(|| {
                engine.begin(&session).unwrap();
                for key in &keys {
                    engine.put(Some(&session), key.as_str(), value.clone()).unwrap();
                }
                black_box(engine.commit(&session).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark reads that fall through a deep stack to the store.
fn bench_nested_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_get");

    for depth in [1, 8, 64].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            let engine = StagingEngine::open_in_memory().unwrap();
            let keys = keys("base", 1000);
            for key in &keys {
                engine.put(None, key.as_str(), random_value(32)).unwrap();
            }
            let session = engine.create_session();
            for _ in 0..depth {
                engine.begin(&session).unwrap();
            }

            b.iter(|| {
                let value = engine.get(Some(&session), black_box(pick(&keys))).unwrap();
                black_box(value);
            });
        });
    }

    group.finish();
}

/// Benchmark outermost commits against an on-disk store.
fn bench_file_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_commit");
    group.sample_size(20);

    for sync in [false, true].iter() {
        let name = if *sync { "sync" } else { "flush" };
        group.bench_function(name, |b| {
            let dir = TempDir::new().unwrap();
            let config = Config::default().sync_on_commit(*sync).history_file(None);
            let engine = StagingEngine::open(dir.path(), config).unwrap();
            let session = engine.create_session();
            let keys = keys("file", 10);
            let value = random_value(256);

            b.iter(|| {
                engine.begin(&session).unwrap();
                for key in &keys {
                    engine.put(Some(&session), key.as_str(), value.clone()).unwrap();
                }
                engine.commit(&session).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_autocommit_put,
    bench_transaction_commit,
    bench_nested_get,
    bench_file_commit,
);
criterion_main!(benches);
