//! Throughput Benchmark for flintkv
//!
//! Measures the keyspace accessors and the wire-protocol parser under
//! various workloads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flintkv::protocol::parse_frame;
use flintkv::storage::Keyspace;
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let keyspace = Arc::new(Keyspace::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i);
            keyspace.set(&key, "small_value");
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = "x".repeat(1024); // 1KB value
        b.iter(|| {
            let key = format!("key:{}", i);
            keyspace.set(&key, &value);
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let keyspace = Arc::new(Keyspace::new());

    // Pre-populate with data
    for i in 0..100_000 {
        keyspace.set(&format!("key:{}", i), &format!("value:{}", i));
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(keyspace.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(keyspace.get(&key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let keyspace = Arc::new(Keyspace::new());

    // Pre-populate
    for i in 0..10_000 {
        keyspace.set(&format!("key:{}", i), &format!("value:{}", i));
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                // 20% writes
                keyspace.set(&format!("new:{}", i), "value");
            } else {
                // 80% reads
                black_box(keyspace.get(&format!("key:{}", i % 10_000)));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark INCR operations
fn bench_incr(c: &mut Criterion) {
    let keyspace = Arc::new(Keyspace::new());

    let mut group = c.benchmark_group("incr");
    group.throughput(Throughput::Elements(1));

    // Single counter (high contention)
    group.bench_function("single_counter", |b| {
        b.iter(|| {
            black_box(keyspace.incr_by("counter", 1).unwrap());
        });
    });

    // Multiple counters (low contention)
    group.bench_function("multiple_counters", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("counter:{}", i % 1000);
            black_box(keyspace.incr_by(&key, 1).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark typed-namespace operations
fn bench_typed(c: &mut Criterion) {
    let keyspace = Arc::new(Keyspace::new());

    let mut group = c.benchmark_group("typed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("rpush_lpop", |b| {
        b.iter(|| {
            keyspace.rpush("queue", &["job".to_string()]);
            black_box(keyspace.lpop("queue"));
        });
    });

    group.bench_function("hset_hget", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let field = format!("f{}", i % 64);
            keyspace.hset("hash", &[(field.clone(), "v".to_string())]);
            black_box(keyspace.hget("hash", &field));
            i += 1;
        });
    });

    // zrange over a populated sorted set
    for i in 0..1_000 {
        keyspace.zadd("zset", &[(i as f64, format!("member:{}", i))]);
    }
    group.bench_function("zrange_full", |b| {
        b.iter(|| {
            black_box(keyspace.zrange("zset", 0, -1));
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let keyspace = Arc::new(Keyspace::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let keyspace = Arc::clone(&keyspace);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            keyspace.set(&key, "value");
                            keyspace.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(keyspace.counts());
        });
    });

    group.finish();
}

/// Benchmark wire-protocol parsing
fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");
    group.throughput(Throughput::Elements(1));

    let small = b"*3\r\n$3\r\nSET\r\n$8\r\nuser:101\r\n$5\r\nvalue\r\n";
    group.bench_function("parse_set_request", |b| {
        b.iter(|| {
            black_box(parse_frame(small).unwrap().unwrap());
        });
    });

    let payload = "x".repeat(4096);
    let large = format!("*3\r\n$3\r\nSET\r\n$3\r\nbig\r\n${}\r\n{}\r\n", payload.len(), payload);
    group.bench_function("parse_4k_bulk", |b| {
        b.iter(|| {
            black_box(parse_frame(large.as_bytes()).unwrap().unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_incr,
    bench_typed,
    bench_concurrent,
    bench_parser,
);

criterion_main!(benches);
