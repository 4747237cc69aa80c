use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use obe_grid::{linspace, GridEvaluator, Pointwise};

fn grid_eval_bench(c: &mut Criterion) {
    let mut grid = GridEvaluator::with_model(Arc::new(Pointwise::new(
        |s: &[f64], p: &[f64], c: &[f64]| c[0] / (1.0 + (s[0] - p[0]).powi(2) / p[1].powi(2)),
    )));
    grid.configure(
        &[linspace(0.0, 1.0, 101)],
        &[linspace(0.1, 0.9, 41), linspace(0.01, 0.2, 50)],
        &[1.0],
    )
    .unwrap();

    c.bench_function("eval_over_parameters_41x50", |b| {
        b.iter(|| black_box(grid.evaluate_over_parameter_grid(&[0.6]).unwrap()));
    });
    c.bench_function("configure_101_41x50", |b| {
        b.iter(|| {
            let mut fresh = GridEvaluator::new();
            fresh
                .configure(
                    &[linspace(0.0, 1.0, 101)],
                    &[linspace(0.1, 0.9, 41), linspace(0.01, 0.2, 50)],
                    &[1.0],
                )
                .unwrap();
            black_box(fresh);
        });
    });
}

criterion_group!(benches, grid_eval_bench);
criterion_main!(benches);
