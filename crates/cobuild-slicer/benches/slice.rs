//! Slicing benchmarks.
//!
//! Run with: cargo bench -p cobuild-slicer

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cobuild_chunker::{Chunk, ChunkGeometry};
use cobuild_kernel_math::Point3;
use cobuild_kernel_mesh::shapes::{cone, cuboid};
use cobuild_slicer::{slice_chunk, SliceSettings};

fn bench_slice_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice_block");
    let settings = SliceSettings::default();
    for height in [10.0, 40.0] {
        let mesh = cuboid(Point3::origin(), Point3::new(100.0, 60.0, height));
        group.bench_with_input(BenchmarkId::from_parameter(height), &mesh, |b, mesh| {
            b.iter(|| {
                let mut chunk = Chunk::new(0, ChunkGeometry::Mesh(mesh.clone()));
                black_box(slice_chunk(&mut chunk, &settings))
            })
        });
    }
    group.finish();
}

fn bench_slice_cone(c: &mut Criterion) {
    let mesh = cone(Point3::origin(), 30.0, 20.0, 64);
    let settings = SliceSettings::default();
    c.bench_function("slice_cone_64", |b| {
        b.iter(|| {
            let mut chunk = Chunk::new(0, ChunkGeometry::Mesh(mesh.clone()));
            black_box(slice_chunk(&mut chunk, &settings))
        })
    });
}

criterion_group!(benches, bench_slice_block, bench_slice_cone);
criterion_main!(benches);
