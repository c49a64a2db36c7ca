//! Benchmark one label extraction per resolution level, plus the whole-volume
//! label scans.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use label_mesh::{extract, stats, DenseLabelVolume, Label, MeshingConfig, SurfaceNetsExtractor};

/// 64³ volume with a sphere of label 1 and a box of label 2.
fn blob_volume() -> DenseLabelVolume {
  let mut volume = DenseLabelVolume::new([64, 64, 64]);
  volume.fill_where(Label(1), |p| p.distance(Vec3::splat(24.0)) < 16.0);
  volume.fill_where(Label(2), |p| p.cmpgt(Vec3::splat(44.0)).all() && p.cmplt(Vec3::splat(60.0)).all());
  volume
}

/// Extraction time for each level of the default level sequence.
fn bench_levels(c: &mut Criterion) {
  let volume = blob_volume();
  let extractor = SurfaceNetsExtractor::new();
  let config = MeshingConfig::default();

  let mut group = c.benchmark_group("extract sphere (64³)");
  for (scale, cube_size) in config.level_scales.iter().zip(config.level_cube_sizes()) {
    group.bench_with_input(BenchmarkId::from_parameter(scale), &cube_size, |b, &cube_size| {
      b.iter(|| {
        let mesh = extract(black_box(&volume), Label(1), cube_size, &extractor);
        black_box(mesh)
      })
    });
  }
  group.finish();
}

/// Full-volume scans used by show-all and show-largest.
fn bench_scans(c: &mut Criterion) {
  let volume = blob_volume();

  c.bench_function("distinct_labels (64³)", |b| {
    b.iter(|| black_box(stats::distinct_labels(black_box(&volume))))
  });

  c.bench_function("largest_labels k=1 (64³)", |b| {
    b.iter(|| {
      let counts = stats::label_voxel_counts(black_box(&volume));
      black_box(stats::largest_labels(&counts, 1))
    })
  });
}

criterion_group!(benches, bench_levels, bench_scans);
criterion_main!(benches);
