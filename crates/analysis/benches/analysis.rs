//! Benchmarks over synthetic grids and channel networks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use thalweg_analysis::prelude::*;

/// A size x size grid with a one-cell NaN border.
fn bordered_grid(size: usize) -> Raster<f64> {
    let mut grid: Raster<f64> = Raster::filled(size, size, f64::NAN);
    grid.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 1..size - 1 {
        for col in 1..size - 1 {
            grid.set(row, col, (row * size + col) as f64).unwrap();
        }
    }
    grid
}

/// A single channel of `len` nodes across a 1 x len grid, head first.
fn straight_network(len: usize) -> (StreamNetwork, NodeAttributeList) {
    let mut grid: Raster<f64> = Raster::new(1, len);
    grid.set_transform(GeoTransform::new(0.0, 1.0, 1.0, -1.0));

    let positions: Vec<usize> = (0..len).collect();
    let downstream: Vec<Option<usize>> = (0..len)
        .map(|node| if node + 1 < len { Some(node + 1) } else { None })
        .collect();
    let distance: Vec<f64> = (0..len).map(|node| (len - 1 - node) as f64).collect();

    let network = StreamNetwork::new(&grid, positions, downstream, distance).unwrap();
    let values: Vec<f64> = (0..len).map(|node| 100.0 + node as f64 * 0.25).collect();
    let attrs = NodeAttributeList::from_column(values, &network).unwrap();
    (network, attrs)
}

fn bench_crop(c: &mut Criterion) {
    let mut group = c.benchmark_group("crop");
    for &size in &[64usize, 256, 1024] {
        let grid = bordered_grid(size);
        let params = CropParams::default();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(crop(&grid, &params).unwrap()));
        });
    }
    group.finish();
}

fn bench_node_values(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_values");
    for &len in &[1_000usize, 10_000] {
        let (network, attrs) = straight_network(len);
        let span = (len - 1) as f64;

        let by_distance = NodeValuesParams {
            query: NodeQuery::ByDistance(
                (0..500).map(|i| i as f64 * span / 500.0).collect(),
            ),
        };
        group.bench_with_input(BenchmarkId::new("by_distance", len), &len, |b, _| {
            b.iter(|| black_box(node_values(&network, &attrs, &by_distance).unwrap()));
        });

        let by_coordinate = NodeValuesParams {
            query: NodeQuery::ByCoordinate(
                (0..500)
                    .map(|i| (i as f64 * span / 500.0, 0.3 + (i % 7) as f64 * 0.1))
                    .collect(),
            ),
        };
        group.bench_with_input(BenchmarkId::new("by_coordinate", len), &len, |b, _| {
            b.iter(|| black_box(node_values(&network, &attrs, &by_coordinate).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_crop, bench_node_values);
criterion_main!(benches);
