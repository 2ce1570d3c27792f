//! Criterion micro-benchmarks for building regions and change notification.

use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use femesh_bench::{reference_mesh, REFERENCE_CUBES};
use femesh_core::{FieldDefinition, ValueType};
use femesh_layout::NodeField;
use femesh_region::{Region, RegionConfig};
use femesh_test_utils::fixtures::Grid;

/// Benchmark: Build the 10x10x10 block without faces.
fn bench_build_block(c: &mut Criterion) {
    c.bench_function("build_block_1000_cubes", |b| {
        b.iter(|| {
            let region = Region::new(RegionConfig::default()).unwrap();
            Grid::new(&[REFERENCE_CUBES; 3]).build(&region).unwrap();
            black_box(region.number_of_elements());
        });
    });
}

/// Benchmark: Build the 10x10x10 block with shared faces and lines.
fn bench_build_block_with_faces(c: &mut Criterion) {
    c.bench_function("build_block_with_faces", |b| {
        b.iter(|| {
            let region = reference_mesh(42).unwrap();
            black_box(region.number_of_elements());
        });
    });
}

/// Benchmark: Define a new field on every node of the block in one change
/// window, with 16 callbacks registered.
///
/// All nodes move to the same new layout, so this measures layout
/// interning plus one notification fan-out.
fn bench_define_field_on_all_nodes(c: &mut Criterion) {
    let region = reference_mesh(42).unwrap();
    let calls = Rc::new(Cell::new(0usize));
    for _ in 0..16 {
        let calls = Rc::clone(&calls);
        region.add_callback_fn(move |_, changes| {
            calls.set(calls.get() + changes.nodes().len());
        });
    }
    let mut generation = 0u32;

    c.bench_function("define_field_on_1331_nodes", |b| {
        b.iter(|| {
            generation += 1;
            let name = format!("scratch_{generation}");
            let scratch = region
                .create_field(&name, FieldDefinition::new(ValueType::Real, 1))
                .unwrap();
            let field = region.merge_field(&scratch).unwrap();
            region.begin_change();
            for node in region.nodes() {
                region
                    .define_field_at_node(&node, NodeField::values_only(field.clone()))
                    .unwrap();
            }
            region.end_change().unwrap();
            region.begin_change();
            region.undefine_field_in_node_list(&field, &region.nodes()).unwrap();
            region.remove_field(&field).unwrap();
            region.end_change().unwrap();
        });
    });
    black_box(calls.get());
}

criterion_group!(
    benches,
    bench_build_block,
    bench_build_block_with_faces,
    bench_define_field_on_all_nodes
);
criterion_main!(benches);
