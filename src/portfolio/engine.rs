//! # Portfolio Engine
//!
//! $$
//! \text{returns}\ \to\ (\hat\mu,\hat\Sigma)\ \to\ \{\mathbf{w}_{\max S},\ \mathbf{w}_{\min\sigma}\}
//! $$
//!
//! High-level entry point: estimates statistics, runs both optimizations and
//! assembles the named portfolios.

use tracing::info;

use super::data::estimate;
use super::data::AssetStatistics;
use super::data::DEFAULT_PERIODS_PER_YEAR;
use super::error::PortfolioError;
use super::error::Result;
use super::frontier::sample_frontier_par;
use super::metrics::metrics_for;
use super::metrics::NegativeRatio;
use super::metrics::Volatility;
use super::optimizers::optimize;
use super::optimizers::SolverSettings;
use super::optimizers::WeightConstraints;
use super::types::AssetWeight;
use super::types::FrontierSample;
use super::types::OptimizationResult;
use super::types::PortfolioReport;
use super::types::ReturnsMatrix;
use super::types::SolverReport;

/// Decimal places kept in the presentation weights.
pub const WEIGHT_DECIMALS: i32 = 4;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug)]
pub struct PortfolioConfig {
  /// Annualization factor applied to mean and covariance.
  pub periods_per_year: f64,
  /// Annualized risk-free rate used in the ratio.
  pub risk_free_rate: f64,
  /// Random frontier samples to draw; `0` disables sampling.
  pub num_frontier_samples: usize,
  /// Seed for the frontier sampler.
  pub frontier_seed: u64,
  pub solver: SolverSettings,
}

impl Default for PortfolioConfig {
  fn default() -> Self {
    Self {
      periods_per_year: DEFAULT_PERIODS_PER_YEAR,
      risk_free_rate: 0.02,
      num_frontier_samples: 0,
      frontier_seed: 42,
      solver: SolverSettings::default(),
    }
  }
}

impl PortfolioConfig {
  pub fn validate(&self) -> Result<()> {
    if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
      return Err(PortfolioError::invalid(format!(
        "periods_per_year must be positive and finite, got {}",
        self.periods_per_year
      )));
    }
    if !self.risk_free_rate.is_finite() {
      return Err(PortfolioError::invalid("risk_free_rate must be finite"));
    }
    self.solver.validate()
  }
}

fn round_weight(w: f64) -> f64 {
  let scale = 10f64.powi(WEIGHT_DECIMALS);
  (w * scale).round() / scale
}

/// Package solver weights with their metrics and a rounded per-asset mapping.
///
/// Metrics always come from the unrounded weights.
pub fn assemble(
  weights: Vec<f64>,
  stats: &AssetStatistics,
  risk_free_rate: f64,
  report: SolverReport,
) -> OptimizationResult {
  let metrics = metrics_for(&weights, stats, risk_free_rate);
  let allocation = stats
    .assets()
    .iter()
    .zip(weights.iter())
    .map(|(asset, &w)| AssetWeight {
      asset: asset.clone(),
      weight: round_weight(w),
    })
    .collect();

  OptimizationResult {
    weights,
    metrics,
    allocation,
    report,
  }
}

/// Single entry-point engine for portfolio optimization.
#[derive(Clone, Debug, Default)]
pub struct PortfolioEngine {
  config: PortfolioConfig,
}

impl PortfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: PortfolioConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioConfig {
    &self.config
  }

  /// Estimate statistics from `returns` and optimize both portfolios.
  pub fn optimize(&self, returns: &ReturnsMatrix) -> Result<PortfolioReport> {
    self.config.validate()?;
    let stats = estimate(returns, self.config.periods_per_year)?;
    self.optimize_statistics(&stats)
  }

  /// Optimize both portfolios for already annualized statistics.
  pub fn optimize_statistics(&self, stats: &AssetStatistics) -> Result<PortfolioReport> {
    self.config.validate()?;

    let n = stats.num_assets();
    let rf = self.config.risk_free_rate;
    let settings = self.config.solver;
    let constraints = WeightConstraints::long_only();

    let (max_ratio, min_vol) = rayon::join(
      || optimize(&NegativeRatio::new(stats, rf), n, &constraints, &settings),
      || optimize(&Volatility::new(stats), n, &constraints, &settings),
    );
    let max_ratio = max_ratio?;
    let min_vol = min_vol?;

    let frontier = (self.config.num_frontier_samples > 0).then(|| self.frontier(stats));

    let report = PortfolioReport {
      max_ratio_portfolio: assemble(max_ratio.weights, stats, rf, max_ratio.report),
      min_volatility_portfolio: assemble(min_vol.weights, stats, rf, min_vol.report),
      frontier,
    };

    info!(
      assets = n,
      max_ratio = report.max_ratio_portfolio.metrics.ratio,
      min_volatility = report.min_volatility_portfolio.metrics.volatility,
      frontier_samples = self.config.num_frontier_samples,
      "portfolio optimization finished"
    );

    Ok(report)
  }

  /// Random frontier samples using the configured count and seed.
  pub fn frontier(&self, stats: &AssetStatistics) -> Vec<FrontierSample> {
    sample_frontier_par(
      stats,
      self.config.risk_free_rate,
      self.config.num_frontier_samples,
      self.config.frontier_seed,
    )
  }
}

/// Optimize the max-ratio and min-volatility portfolios for a returns table.
pub fn optimize_portfolio(returns: &ReturnsMatrix, config: &PortfolioConfig) -> Result<PortfolioReport> {
  PortfolioEngine::new(config.clone()).optimize(returns)
}
