use bikerental_admin::models::LocationPoint;
use bikerental_admin::services::{maps, ride_metrics};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// A long ride: one fix every 5 seconds, drifting north-east at cycling pace.
fn synthetic_path(points: usize) -> Vec<LocationPoint> {
    let start_ms = 1_772_611_200_000_i64;
    (0..points)
        .map(|i| {
            let step = i as f64;
            LocationPoint::at(
                37.4219 + step * 0.00012,
                -122.0841 + step * 0.00009,
                start_ms + i as i64 * 5_000,
            )
        })
        .collect()
}

fn benchmark_ride_metrics(c: &mut Criterion) {
    let path = synthetic_path(5_000);

    let mut group = c.benchmark_group("ride_path");

    group.bench_function("total_distance", |b| {
        b.iter(|| ride_metrics::total_distance(black_box(&path)))
    });

    group.bench_function("speeds_from_path", |b| {
        b.iter(|| ride_metrics::speeds_from_path(black_box(&path)))
    });

    group.bench_function("encode_polyline", |b| {
        b.iter(|| maps::encode_path(black_box(&path)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_ride_metrics);
criterion_main!(benches);
