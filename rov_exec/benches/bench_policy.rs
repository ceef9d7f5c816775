//! # Policy Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;

use rov_lib::planner::{compute_policy, GridCell, NavGrid};

fn policy_benchmark(c: &mut Criterion) {
    // ---- Build a 200x200 grid with walls ----

    // Every 20th column is a wall with a single gap, alternating between the top and bottom so
    // that the shortest path snakes across the grid
    let traversable = Array2::from_shape_fn((200, 200), |(y, x)| {
        if x % 20 != 10 {
            return true
        }

        match (x / 20) % 2 {
            0 => y == 199,
            _ => y == 0,
        }
    });

    let grid = NavGrid::new(traversable).unwrap();
    let goal = GridCell::new(199, 100);

    c.bench_function("compute_policy 200x200", |b| {
        b.iter(|| compute_policy(black_box(&grid), black_box(goal)))
    });

    let open = NavGrid::open(200, 200);

    c.bench_function("compute_policy 200x200 open", |b| {
        b.iter(|| compute_policy(black_box(&open), black_box(goal)))
    });
}

criterion_group!(benches, policy_benchmark);
criterion_main!(benches);
