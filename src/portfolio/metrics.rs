//! # Portfolio Metrics
//!
//! $$
//! \mu_p=\mathbf{w}^\top\mu,\quad \sigma_p=\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}},\quad
//! S_p=\frac{\mu_p-r_f}{\sigma_p+\varepsilon}
//! $$
//!
//! Metric function and the scalar objectives minimized by the optimizers.

use argmin::core::CostFunction;
use argmin::core::Gradient;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;

use super::data::AssetStatistics;
use super::types::PortfolioMetrics;

/// Smoothing term keeping the ratio finite for zero-volatility portfolios.
pub const RATIO_EPS: f64 = 1e-12;

fn variance(w: ArrayView1<f64>, cov: &Array2<f64>) -> f64 {
  w.dot(&cov.dot(&w)).max(0.0)
}

/// Expected return, volatility and Sharpe-like ratio of `weights`.
pub fn portfolio_metrics(
  weights: &[f64],
  mean: &Array1<f64>,
  cov: &Array2<f64>,
  risk_free_rate: f64,
) -> PortfolioMetrics {
  let w = ArrayView1::from(weights);
  let expected_return = w.dot(mean);
  let volatility = variance(w, cov).sqrt();
  let ratio = (expected_return - risk_free_rate) / (volatility + RATIO_EPS);

  PortfolioMetrics {
    expected_return,
    volatility,
    ratio,
  }
}

/// [`portfolio_metrics`] against a bundle of annualized statistics.
pub fn metrics_for(
  weights: &[f64],
  stats: &AssetStatistics,
  risk_free_rate: f64,
) -> PortfolioMetrics {
  portfolio_metrics(weights, stats.mean(), stats.cov(), risk_free_rate)
}

/// Scalar objective over weight vectors, minimized by the optimizers.
pub trait PortfolioObjective:
  CostFunction<Param = Vec<f64>, Output = f64>
  + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>
  + Clone
  + Send
  + Sync
{
  /// Short label for logs and reports.
  fn name(&self) -> &'static str;

  /// Whether `w` sits on a kink where the gradient is not a usable subgradient.
  fn is_kink(&self, _w: &[f64]) -> bool {
    false
  }
}

/// `-S_p`: minimizing it maximizes the Sharpe-like ratio.
#[derive(Clone, Debug)]
pub struct NegativeRatio {
  mean: Array1<f64>,
  cov: Array2<f64>,
  risk_free_rate: f64,
}

impl NegativeRatio {
  pub fn new(stats: &AssetStatistics, risk_free_rate: f64) -> Self {
    Self {
      mean: stats.mean().clone(),
      cov: stats.cov().clone(),
      risk_free_rate,
    }
  }

  pub fn value(&self, w: &[f64]) -> f64 {
    -portfolio_metrics(w, &self.mean, &self.cov, self.risk_free_rate).ratio
  }

  pub fn grad(&self, w: &[f64]) -> Vec<f64> {
    let wv = ArrayView1::from(w);
    let sigma_w = self.cov.dot(&wv);
    let vol = wv.dot(&sigma_w).max(0.0).sqrt();
    let excess = wv.dot(&self.mean) - self.risk_free_rate;
    let denom = vol + RATIO_EPS;

    // d vol / dw = Sigma w / vol; zero when vol == 0 since Sigma w == 0 for PSD Sigma.
    let dvol = if vol > 0.0 {
      sigma_w / vol
    } else {
      Array1::zeros(w.len())
    };

    ((&dvol * (excess / (denom * denom))) - (&self.mean / denom)).to_vec()
  }
}

impl CostFunction for NegativeRatio {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, w: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    Ok(self.value(w))
  }
}

impl Gradient for NegativeRatio {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, w: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    Ok(self.grad(w))
  }
}

impl PortfolioObjective for NegativeRatio {
  fn name(&self) -> &'static str {
    "negative ratio"
  }

  /// Zero-volatility points: `sqrt` is not differentiable there.
  fn is_kink(&self, w: &[f64]) -> bool {
    variance(ArrayView1::from(w), &self.cov).sqrt() <= RATIO_EPS
  }
}

/// `sigma_p`: portfolio volatility.
#[derive(Clone, Debug)]
pub struct Volatility {
  cov: Array2<f64>,
}

impl Volatility {
  pub fn new(stats: &AssetStatistics) -> Self {
    Self {
      cov: stats.cov().clone(),
    }
  }

  pub fn value(&self, w: &[f64]) -> f64 {
    variance(ArrayView1::from(w), &self.cov).sqrt()
  }

  pub fn grad(&self, w: &[f64]) -> Vec<f64> {
    let wv = ArrayView1::from(w);
    let sigma_w = self.cov.dot(&wv);
    let vol = wv.dot(&sigma_w).max(0.0).sqrt();
    if vol > 0.0 {
      (sigma_w / vol).to_vec()
    } else {
      vec![0.0; w.len()]
    }
  }
}

impl CostFunction for Volatility {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, w: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    Ok(self.value(w))
  }
}

impl Gradient for Volatility {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, w: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    Ok(self.grad(w))
  }
}

impl PortfolioObjective for Volatility {
  fn name(&self) -> &'static str {
    "volatility"
  }

  fn is_kink(&self, w: &[f64]) -> bool {
    self.value(w) <= RATIO_EPS
  }
}
