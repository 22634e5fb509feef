//! Telemetry Client Benchmarks
//!
//! Measures the hot paths that run on every log call: rate-limit admission,
//! level parsing and record serialization.

use alloy_telemetry::log::{IntoLevel, Level, LogRecord};
use alloy_telemetry::RateLimiter;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opentelemetry::KeyValue;

/// Benchmark token acquisition with a bucket that never runs dry
fn bench_rate_limiter_acquire(c: &mut Criterion) {
    let limiter = RateLimiter::new(1_000_000_000.0, u32::MAX);

    c.bench_function("rate_limiter_try_acquire", |b| {
        b.iter(|| {
            black_box(limiter.try_acquire());
        });
    });
}

/// Benchmark level parsing from names and codes
fn bench_level_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_parsing");

    group.bench_function("name", |b| {
        b.iter(|| {
            let _ = black_box(black_box("WARN").into_level());
        });
    });

    group.bench_function("code", |b| {
        b.iter(|| {
            let _ = black_box(black_box(3_i8).into_level());
        });
    });

    group.finish();
}

/// Benchmark record serialization with different attribute counts
fn bench_record_to_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_to_json");

    for count in [0usize, 4, 16] {
        let attributes: Vec<KeyValue> = (0..count)
            .map(|i| KeyValue::new(format!("attr.{}", i), i as i64))
            .collect();
        let record = LogRecord::new(Level::Info, "request handled", "addi", Some("abc-123"))
            .with_attributes(&attributes);

        group.bench_with_input(BenchmarkId::from_parameter(count), &record, |b, record| {
            b.iter(|| {
                let _ = black_box(record.to_json());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_rate_limiter_acquire,
    bench_level_parsing,
    bench_record_to_json
);
criterion_main!(benches);
