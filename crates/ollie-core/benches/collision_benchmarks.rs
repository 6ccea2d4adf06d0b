//! Collision dispatch benchmarks.
//!
//! Measures the per-pair cost of the closed-form tests and of the
//! separating-axis path used for polygons, plus a broad all-pairs sweep of the
//! size a busy level produces in one tick.
//!
//! Run with: `cargo bench --bench collision_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ollie_core::math::{Rect2, Vec2};
use ollie_core::shape::ColliderShape;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn regular_polygon(center: Vec2, radius: f64, sides: usize) -> ColliderShape {
    let step = std::f64::consts::TAU / sides as f64;
    ColliderShape::polygon(
        (0..sides)
            .map(|i| center + Vec2::from_angle(step * i as f64) * radius)
            .collect(),
    )
}

/// A deterministic scatter of mixed shapes.
fn scene(count: usize) -> Vec<ColliderShape> {
    (0..count)
        .map(|i| {
            let x = (i * 37 % 800) as f64;
            let y = (i * 91 % 450) as f64;
            match i % 3 {
                0 => ColliderShape::circle(Vec2::new(x, y), 12.0),
                1 => ColliderShape::rectangle(Rect2::new(x, y, 40.0, 20.0)),
                _ => regular_polygon(Vec2::new(x, y), 15.0, 6),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_pairs(c: &mut Criterion) {
    let circle = ColliderShape::circle(Vec2::new(0.0, 0.0), 10.0);
    let rect = ColliderShape::rectangle(Rect2::new(5.0, 5.0, 20.0, 20.0));
    let ray = ColliderShape::ray(Vec2::new(-50.0, 0.0), Vec2::RIGHT, 100.0);
    let hex = regular_polygon(Vec2::new(8.0, 0.0), 10.0, 6);

    let mut group = c.benchmark_group("pair");
    group.bench_function("circle_circle", |b| {
        b.iter(|| black_box(&circle).check_collision(black_box(&circle)))
    });
    group.bench_function("circle_rect_swapped", |b| {
        b.iter(|| black_box(&circle).check_collision(black_box(&rect)))
    });
    group.bench_function("ray_rect", |b| {
        b.iter(|| black_box(&ray).check_collision(black_box(&rect)))
    });
    group.bench_function("polygon_polygon", |b| {
        b.iter(|| black_box(&hex).check_collision(black_box(&hex)))
    });
    group.bench_function("polygon_circle_mtv", |b| {
        b.iter(|| black_box(&hex).get_collision(black_box(&circle)))
    });
    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_pairs");
    for count in [50usize, 200] {
        let shapes = scene(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &shapes, |b, shapes| {
            b.iter(|| {
                let mut hits = 0usize;
                for (i, a) in shapes.iter().enumerate() {
                    for other in &shapes[i + 1..] {
                        if a.check_collision(other) {
                            hits += 1;
                        }
                    }
                }
                black_box(hits)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pairs, bench_sweep);
criterion_main!(benches);
