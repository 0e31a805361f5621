use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use optcore::{
    costs::L2NormCost,
    nalgebra::{DMatrix, DVector},
    Cost, SampledTrajectory, SampledTrajectoryOptions,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

const SAMPLES: usize = 1_000;

fn random_matrix(rng: &mut StdRng, nrows: usize, ncols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(nrows, ncols, |_, _| rng.sample(StandardNormal))
}

fn random_vector(rng: &mut StdRng, n: usize) -> DVector<f64> {
    DVector::from_fn(n, |_, _| rng.sample(StandardNormal))
}

fn tracking_cost(n: usize, m: usize) -> L2NormCost<f64> {
    let mut rng = StdRng::seed_from_u64(42);

    let tracked = n / 2;
    let mut cost = L2NormCost::with_selectors(
        "bench",
        random_matrix(&mut rng, tracked, n),
        DMatrix::identity(m, m),
    );

    let l = random_matrix(&mut rng, tracked, tracked);
    cost.set_state_weight(&(l.transpose() * &l)).unwrap();

    let times = (0..SAMPLES).map(|i| i as f64 * 0.01).collect();
    let values = (0..SAMPLES)
        .map(|_| random_vector(&mut rng, tracked))
        .collect();
    let mut options = SampledTrajectoryOptions::default();
    options.set_hold_ends(true);
    let reference = SampledTrajectory::with_options(times, values, options).unwrap();
    cost.set_state_desired_trajectory(Arc::new(reference))
        .unwrap();

    cost
}

fn gradient(c: &mut Criterion) {
    for &(n, m) in &[(4, 2), (32, 8), (128, 16)] {
        let cost = tracking_cost(n, m);
        let state = DVector::from_element(n, 0.5);
        let control = DVector::zeros(m);
        let mut gradient = DVector::zeros(n);

        c.bench_function(&format!("l2 norm state gradient {}x{}", n, m), |b| {
            b.iter(|| {
                cost.state_gradient(black_box(3.333), &state, &control, &mut gradient)
                    .unwrap()
            })
        });
    }
}

fn hessian(c: &mut Criterion) {
    for &(n, m) in &[(4, 2), (32, 8), (128, 16)] {
        let cost = tracking_cost(n, m);
        let state = DVector::from_element(n, 0.5);
        let control = DVector::zeros(m);
        let mut hessian = DMatrix::zeros(n, n);

        c.bench_function(&format!("l2 norm state hessian {}x{}", n, m), |b| {
            b.iter(|| {
                cost.state_hessian(black_box(3.333), &state, &control, &mut hessian)
                    .unwrap()
            })
        });
    }
}

fn value(c: &mut Criterion) {
    let cost = tracking_cost(32, 8);
    let state = DVector::from_element(32, 0.5);
    let control = DVector::from_element(8, -0.5);

    c.bench_function("l2 norm value 32x8", |b| {
        b.iter(|| cost.value(black_box(3.333), &state, &control).unwrap())
    });
}

criterion_group!(costs, gradient, hessian, value);
criterion_main!(costs);
