//! Criterion micro-benchmarks for region merging.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use femesh_bench::split_mesh;
use femesh_region::{can_be_merged, merge};

/// Benchmark: Compatibility check of the upper half against the lower.
fn bench_can_be_merged(c: &mut Criterion) {
    let (lower, upper) = split_mesh(42).unwrap();

    c.bench_function("can_be_merged_half_blocks", |b| {
        b.iter(|| black_box(can_be_merged(&lower, &upper)));
    });
}

/// Benchmark: Merge the upper half into a fresh lower half.
fn bench_merge_halves(c: &mut Criterion) {
    c.bench_function("merge_half_blocks", |b| {
        b.iter_batched(
            || split_mesh(42).unwrap(),
            |(lower, upper)| {
                merge(&lower, &upper).unwrap();
                black_box(lower.number_of_nodes());
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_can_be_merged, bench_merge_halves);
criterion_main!(benches);
