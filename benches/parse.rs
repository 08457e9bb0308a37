//! Parse throughput across backends and the parallel/sequential split.
//!
//! Run with `cargo bench --bench parse`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use turbojson::{parse_with, ParseConfig};

fn record_array(records: usize) -> String {
    let rows: Vec<String> = (0..records)
        .map(|i| {
            format!(
                r#"{{"id": {i}, "name": "user-{i}", "active": {}, "scores": [{}, {}, {}], "note": "row {i} of the fixture"}}"#,
                i % 3 == 0,
                i,
                i * 2,
                i * 3
            )
        })
        .collect();
    format!("[{}]", rows.join(","))
}

fn whitespace_heavy(records: usize) -> String {
    let rows: Vec<String> = (0..records)
        .map(|i| format!("    {{\n        \"v\": {i}\n    }}"))
        .collect();
    format!("[\n{}\n]", rows.join(",\n"))
}

fn backend_configs() -> Vec<(&'static str, ParseConfig)> {
    let sequential = ParseConfig::default().with_parallel(false);
    vec![
        ("scalar", sequential.clone().with_simd(false)),
        ("simd", sequential.clone()),
        ("simd-no-avx512", sequential.clone().with_avx512(false)),
        (
            "simd-sse2-only",
            sequential.with_avx512(false).with_avx2(false),
        ),
    ]
}

fn bench_backends(c: &mut Criterion) {
    let doc = record_array(2_000);
    let bytes = doc.as_bytes();
    let mut group = c.benchmark_group("backends");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    for (name, config) in backend_configs() {
        group.bench_with_input(BenchmarkId::from_parameter(name), bytes, |b, bytes| {
            b.iter(|| parse_with(black_box(bytes), &config))
        });
    }
    group.finish();
}

fn bench_parallel(c: &mut Criterion) {
    let doc = record_array(20_000);
    let bytes = doc.as_bytes();
    let mut group = c.benchmark_group("parallel");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    let sequential = ParseConfig::default().with_parallel(false);
    group.bench_function("sequential", |b| {
        b.iter(|| parse_with(black_box(bytes), &sequential))
    });
    for threads in [2, 4, 8] {
        let config = ParseConfig::default()
            .with_parallel_threshold(0)
            .with_thread_count(threads);
        group.bench_with_input(
            BenchmarkId::new("threads", threads),
            bytes,
            |b, bytes| b.iter(|| parse_with(black_box(bytes), &config)),
        );
    }
    group.finish();
}

fn bench_whitespace(c: &mut Criterion) {
    let doc = whitespace_heavy(5_000);
    let bytes = doc.as_bytes();
    let mut group = c.benchmark_group("whitespace");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    for (name, config) in backend_configs() {
        group.bench_with_input(BenchmarkId::from_parameter(name), bytes, |b, bytes| {
            b.iter(|| parse_with(black_box(bytes), &config))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_backends, bench_parallel, bench_whitespace);
criterion_main!(benches);
