//! Benchmarks for segmentation, fitting and full conversion.
//!
//! Run with: cargo bench -p brepify

#![allow(missing_docs)]

use brepify::adjacency::WeldedMesh;
use brepify::segment::segment;
use brepify::{ConversionConfig, ConversionPipeline, PrimitiveFitter};
use brepify_mesh::shapes::{make_cylinder, make_sphere, make_tube};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_segment(c: &mut Criterion) {
    let config = ConversionConfig::default();
    let mut group = c.benchmark_group("segment");
    for segments in [32u32, 128, 512] {
        let welded = WeldedMesh::new(&make_tube(10.0, 8.0, 20.0, segments), config.vertex_precision);
        group.bench_with_input(BenchmarkId::from_parameter(segments), &welded, |b, welded| {
            b.iter(|| segment(black_box(welded), &config))
        });
    }
    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_all");
    let welded = WeldedMesh::new(&make_sphere(5.0, 64, 32), 1e-4);
    for parallel in [false, true] {
        let config = ConversionConfig {
            parallel,
            ..Default::default()
        };
        let regions = segment(&welded, &config).regions;
        let fitter = PrimitiveFitter::new(&config);
        let name = if parallel { "parallel" } else { "sequential" };
        group.bench_function(name, |b| b.iter(|| fitter.fit_all(black_box(&welded), &regions)));
    }
    group.finish();
}

fn bench_convert(c: &mut Criterion) {
    let pipeline = ConversionPipeline::new(ConversionConfig::default()).expect("default config");
    let mesh = make_cylinder(5.0, 10.0, 128, true);
    c.bench_function("convert_cylinder_128", |b| {
        b.iter(|| pipeline.convert(black_box(&mesh)))
    });
}

criterion_group!(benches, bench_segment, bench_fit, bench_convert);
criterion_main!(benches);
