use std::hint::black_box;

use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use mpt_rs::portfolio::estimate;
use mpt_rs::portfolio::optimize;
use mpt_rs::portfolio::optimize_portfolio;
use mpt_rs::portfolio::sample_frontier;
use mpt_rs::portfolio::sample_frontier_par;
use mpt_rs::portfolio::synthetic_returns;
use mpt_rs::portfolio::NegativeRatio;
use mpt_rs::portfolio::PortfolioConfig;
use mpt_rs::portfolio::ReturnsMatrix;
use mpt_rs::portfolio::SolverMethod;
use mpt_rs::portfolio::SolverSettings;
use mpt_rs::portfolio::WeightConstraints;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn returns(n_assets: usize, periods: usize) -> ReturnsMatrix {
  let labels: Vec<String> = (0..n_assets).map(|i| format!("A{i}")).collect();
  let universe: Vec<(&str, f64, f64)> = labels
    .iter()
    .enumerate()
    .map(|(i, a)| (a.as_str(), 0.0002 + 0.0001 * i as f64, 0.005 + 0.002 * i as f64))
    .collect();
  let mut rng = StdRng::seed_from_u64(42);
  synthetic_returns(&universe, periods, true, &mut rng).unwrap()
}

fn bench_max_ratio(c: &mut Criterion) {
  let mut group = c.benchmark_group("max_ratio");

  for &n in &[4, 16, 64] {
    let stats = estimate(&returns(n, 500), 252.0).unwrap();
    let objective = NegativeRatio::new(&stats, 0.02);
    let constraints = WeightConstraints::long_only();

    for method in [SolverMethod::ProjectedGradient, SolverMethod::NelderMead] {
      let settings = SolverSettings::new(method, 1000, 1e-9, 1e-6);
      group.bench_with_input(BenchmarkId::new(method.to_string(), n), &n, |b, &n| {
        b.iter(|| black_box(optimize(&objective, n, &constraints, &settings).unwrap()))
      });
    }
  }

  group.finish();
}

fn bench_engine(c: &mut Criterion) {
  let data = returns(4, 100);
  let config = PortfolioConfig::default();
  c.bench_function("optimize_portfolio_4x100", |b| {
    b.iter(|| black_box(optimize_portfolio(&data, &config).unwrap()))
  });
}

fn bench_frontier(c: &mut Criterion) {
  let mut group = c.benchmark_group("frontier");
  let stats = estimate(&returns(8, 250), 252.0).unwrap();

  for &size in &[1_000, 10_000] {
    group.bench_with_input(BenchmarkId::new("sequential", size), &size, |b, &size| {
      b.iter(|| black_box(sample_frontier(&stats, 0.02, size, StdRng::seed_from_u64(7))))
    });
    group.bench_with_input(BenchmarkId::new("rayon", size), &size, |b, &size| {
      b.iter(|| black_box(sample_frontier_par(&stats, 0.02, size, 7)))
    });
  }

  group.finish();
}

criterion_group!(benches, bench_max_ratio, bench_engine, bench_frontier);
criterion_main!(benches);
