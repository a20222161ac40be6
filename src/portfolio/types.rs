//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta} \frac{\mathbf{w}^\top\mu-r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! Input table, solver enums and result containers for portfolio optimization.

use std::collections::HashSet;
use std::fmt::Display;

use ndarray::Array2;
use ndarray::ArrayView1;

use super::error::PortfolioError;
use super::error::Result;

/// Dense `periods x assets` table of periodic returns.
///
/// Rows are time periods in order, columns are assets. Construction rejects empty
/// tables, duplicate labels and non-finite entries, so every instance is usable
/// by the estimator as-is.
#[derive(Clone, Debug)]
pub struct ReturnsMatrix {
  assets: Vec<String>,
  data: Array2<f64>,
}

impl ReturnsMatrix {
  /// Build from asset labels and a `periods x assets` array.
  pub fn new(assets: Vec<String>, data: Array2<f64>) -> Result<Self> {
    let (periods, n_assets) = data.dim();

    if n_assets == 0 || assets.is_empty() {
      return Err(PortfolioError::invalid("returns table has no assets"));
    }
    if periods == 0 {
      return Err(PortfolioError::invalid("returns table has no periods"));
    }
    if assets.len() != n_assets {
      return Err(PortfolioError::invalid(format!(
        "{} asset labels for {} return columns",
        assets.len(),
        n_assets
      )));
    }

    let mut seen = HashSet::with_capacity(assets.len());
    for asset in &assets {
      if !seen.insert(asset.as_str()) {
        return Err(PortfolioError::invalid(format!(
          "duplicate asset label `{asset}`"
        )));
      }
    }

    if let Some(((t, j), v)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
      return Err(PortfolioError::invalid(format!(
        "non-finite return {v} for `{}` at period {t}",
        assets[j]
      )));
    }

    Ok(Self { assets, data })
  }

  /// Build from `(label, returns)` columns of equal length.
  pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
    let periods = columns.first().map(|(_, r)| r.len()).unwrap_or(0);
    if let Some((asset, r)) = columns.iter().find(|(_, r)| r.len() != periods) {
      return Err(PortfolioError::invalid(format!(
        "column `{asset}` has {} periods, expected {periods}",
        r.len()
      )));
    }

    let data = Array2::from_shape_fn((periods, columns.len()), |(t, j)| columns[j].1[t]);
    let assets = columns.into_iter().map(|(asset, _)| asset).collect();
    Self::new(assets, data)
  }

  /// Asset labels in column order.
  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  /// Raw `periods x assets` returns.
  pub fn data(&self) -> &Array2<f64> {
    &self.data
  }

  pub fn num_periods(&self) -> usize {
    self.data.nrows()
  }

  pub fn num_assets(&self) -> usize {
    self.data.ncols()
  }

  /// Returns series of a single asset.
  pub fn column(&self, asset: &str) -> Option<ArrayView1<'_, f64>> {
    let j = self.assets.iter().position(|a| a == asset)?;
    Some(self.data.column(j))
  }
}

/// Constrained solver used for both portfolio targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverMethod {
  /// Spectral projected gradient with Armijo backtracking on the feasible set.
  #[default]
  ProjectedGradient,
  /// Derivative-free Nelder-Mead over a softmax parameterization.
  NelderMead,
}

impl SolverMethod {
  /// Parse a string into a [`SolverMethod`].
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "nm" | "nelder-mead" | "neldermead" | "simplex" => Self::NelderMead,
      _ => Self::ProjectedGradient,
    }
  }
}

impl Display for SolverMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SolverMethod::ProjectedGradient => write!(f, "projected gradient"),
      SolverMethod::NelderMead => write!(f, "Nelder-Mead"),
    }
  }
}

/// How a solver run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverStatus {
  /// Tolerance met.
  #[default]
  Converged,
  /// Iteration cap hit before the tolerance was met.
  MaxIterationsReached,
  /// Line search could no longer make progress above the tolerance.
  Stalled,
  /// Objective or gradient became non-finite.
  NumericalFailure,
}

impl SolverStatus {
  pub fn is_converged(&self) -> bool {
    matches!(self, SolverStatus::Converged)
  }
}

/// Diagnostics attached to every optimized portfolio.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolverReport {
  /// Name of the minimized objective.
  pub objective: &'static str,
  pub method: SolverMethod,
  pub status: SolverStatus,
  /// Iterations performed.
  pub iterations: u64,
  /// Objective value at the returned weights.
  pub objective_value: f64,
}

/// Expected return, volatility and Sharpe-like ratio of one weight vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PortfolioMetrics {
  /// Annualized expected return.
  pub expected_return: f64,
  /// Annualized volatility.
  pub volatility: f64,
  /// `(expected_return - risk_free) / (volatility + eps)`.
  pub ratio: f64,
}

/// Presentation weight of a single asset.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetWeight {
  pub asset: String,
  /// Weight rounded to four decimals.
  pub weight: f64,
}

/// One optimized portfolio.
#[derive(Clone, Debug, Default)]
pub struct OptimizationResult {
  /// Unrounded weights, in input asset order.
  pub weights: Vec<f64>,
  /// Metrics computed from the unrounded weights.
  pub metrics: PortfolioMetrics,
  /// Rounded weights keyed by asset, in input asset order.
  pub allocation: Vec<AssetWeight>,
  pub report: SolverReport,
}

impl OptimizationResult {
  pub fn is_converged(&self) -> bool {
    self.report.status.is_converged()
  }

  /// Turn a flagged result into [`PortfolioError::SolverNonConvergence`].
  pub fn ensure_converged(&self) -> Result<&Self> {
    if self.is_converged() {
      Ok(self)
    } else {
      Err(PortfolioError::SolverNonConvergence {
        objective: self.report.objective.to_string(),
        iterations: self.report.iterations,
      })
    }
  }

  /// Rounded weight of `asset`, if present.
  pub fn weight_of(&self, asset: &str) -> Option<f64> {
    self
      .allocation
      .iter()
      .find(|a| a.asset == asset)
      .map(|a| a.weight)
  }
}

/// A randomly sampled feasible portfolio.
#[derive(Clone, Debug, Default)]
pub struct FrontierSample {
  pub weights: Vec<f64>,
  pub metrics: PortfolioMetrics,
}

/// Output of [`optimize_portfolio`](super::engine::optimize_portfolio).
#[derive(Clone, Debug, Default)]
pub struct PortfolioReport {
  /// Tangent portfolio (maximum Sharpe-like ratio).
  pub max_ratio_portfolio: OptimizationResult,
  /// Global minimum-volatility portfolio.
  pub min_volatility_portfolio: OptimizationResult,
  /// Random frontier samples, when sampling is enabled.
  pub frontier: Option<Vec<FrontierSample>>,
}
