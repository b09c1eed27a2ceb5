use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use risklab::battery::run_battery;
use risklab::config::canonical_battery;
use risklab::dataset::derive;
use risklab::synthetic::synthetic_book;

// ── Group 1: derive — metric derivation over book size ──────────────────────

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive");
    for &rows in &[1_000usize, 10_000, 50_000] {
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &n| {
            b.iter_batched(
                || synthetic_book(42, n),
                |book| derive(book).unwrap(),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

// ── Group 2: battery — full canonical battery end-to-end ────────────────────

fn bench_battery(c: &mut Criterion) {
    let mut group = c.benchmark_group("battery");
    for &rows in &[1_000usize, 10_000, 50_000] {
        if rows == 50_000 {
            group.sample_size(10);
        }
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &n| {
            let enriched = derive(synthetic_book(42, n)).unwrap();
            let hypotheses = canonical_battery(&enriched);
            b.iter(|| run_battery(&enriched, &hypotheses).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_derive, bench_battery);
criterion_main!(benches);
