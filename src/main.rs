use mpt_rs::portfolio::frontier_extremes;
use mpt_rs::portfolio::synthetic_returns;
use mpt_rs::portfolio::OptimizationResult;
use mpt_rs::portfolio::PortfolioConfig;
use mpt_rs::portfolio::PortfolioEngine;
use prettytable::row;
use prettytable::Table;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

const ASSETS: [&str; 4] = ["SPY", "QQQ", "GLD", "BND"];
const DAYS: usize = 100;
const SEED: u64 = 42;

fn print_portfolio(title: &str, result: &OptimizationResult) {
  println!("\n{title} ({}, {} iterations)", result.report.method, result.report.iterations);

  let mut table = Table::new();
  table.add_row(row!["Asset", "Weight"]);
  for a in &result.allocation {
    table.add_row(row![a.asset, format!("{:.4}", a.weight)]);
  }
  table.printstd();

  let m = &result.metrics;
  println!(
    "return {:.4}  volatility {:.4}  ratio {:.4}  status {:?}",
    m.expected_return, m.volatility, m.ratio, result.report.status
  );
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let universe: Vec<(&str, f64, f64)> = ASSETS.iter().map(|&a| (a, 0.0005, 0.015)).collect();
  let mut rng = StdRng::seed_from_u64(SEED);
  let returns = synthetic_returns(&universe, DAYS, false, &mut rng)?;

  let engine = PortfolioEngine::new(PortfolioConfig {
    num_frontier_samples: 5000,
    ..PortfolioConfig::default()
  });
  let report = engine.optimize(&returns)?;

  print_portfolio("Max ratio portfolio", &report.max_ratio_portfolio);
  print_portfolio("Min volatility portfolio", &report.min_volatility_portfolio);

  let samples = report.frontier.as_deref().unwrap_or_default();
  if let Some((best, calm)) = frontier_extremes(samples) {
    let mut table = Table::new();
    table.add_row(row!["Random portfolios", "Return", "Volatility", "Ratio"]);
    for (label, s) in [("best ratio", best), ("lowest volatility", calm)] {
      table.add_row(row![
        label,
        format!("{:.4}", s.metrics.expected_return),
        format!("{:.4}", s.metrics.volatility),
        format!("{:.4}", s.metrics.ratio)
      ]);
    }
    println!("\n{} frontier samples", samples.len());
    table.printstd();
  }

  Ok(())
}
