//! # Portfolio Data Utilities
//!
//! $$
//! \hat\mu_i = k\,\bar r_i,\qquad \hat\Sigma_{ij} = \frac{k}{T-1}\sum_{t=1}^{T}(r_{ti}-\bar r_i)(r_{tj}-\bar r_j)
//! $$
//!
//! Price-to-return conversion and annualized mean/covariance estimation.
//! Covariance uses the unbiased (`ddof = 1`) estimator. Both the mean and the
//! covariance are scaled by the same periods-per-year factor `k`; volatility is
//! always derived from the scaled covariance.

use nalgebra::DMatrix;
use nalgebra::SymmetricEigen;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_rand::RandomExt;
use ndarray_stats::CorrelationExt;
use rand::Rng;
use rand_distr::Normal;
use tracing::debug;

use super::error::PortfolioError;
use super::error::Result;
use super::types::ReturnsMatrix;

/// Trading days per year for daily data.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

const SYMMETRY_TOL: f64 = 1e-10;
const PSD_TOL: f64 = 1e-10;

fn check_prices(prices: &[f64]) -> Result<()> {
  if prices.len() < 2 {
    return Err(PortfolioError::invalid(
      "at least two prices are required to form a return",
    ));
  }
  if let Some((i, p)) = prices
    .iter()
    .enumerate()
    .find(|(_, p)| !p.is_finite() || **p <= 0.0)
  {
    return Err(PortfolioError::invalid(format!(
      "price {p} at index {i} is not a positive finite number"
    )));
  }
  Ok(())
}

/// Convert prices to simple returns `p_t / p_{t-1} - 1`, dropping the undefined first entry.
pub fn simple_returns(prices: &[f64]) -> Result<Vec<f64>> {
  check_prices(prices)?;
  Ok(prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
}

/// Convert prices to log returns `ln(p_t / p_{t-1})`.
pub fn log_returns(prices: &[f64]) -> Result<Vec<f64>> {
  check_prices(prices)?;
  Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

impl ReturnsMatrix {
  /// Build a simple-returns table from `(label, prices)` columns.
  pub fn from_prices(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
    let mut out = Vec::with_capacity(columns.len());
    for (asset, prices) in columns {
      let returns = simple_returns(&prices)
        .map_err(|e| PortfolioError::invalid(format!("`{asset}`: {e}")))?;
      out.push((asset, returns));
    }
    Self::from_columns(out)
  }
}

/// Seeded Gaussian returns table for fixtures and demos.
///
/// Column `j` is drawn i.i.d. from `N(mean_j, scale_j)` using `(label, mean, scale)`
/// triples. With `center` the sampled noise is demeaned per column, so each
/// column's sample mean equals its `mean` exactly.
pub fn synthetic_returns<R: Rng + ?Sized>(
  assets: &[(&str, f64, f64)],
  periods: usize,
  center: bool,
  rng: &mut R,
) -> Result<ReturnsMatrix> {
  let mut columns = Vec::with_capacity(assets.len());
  for &(asset, mean, scale) in assets {
    let normal = Normal::new(0.0, scale)
      .map_err(|e| PortfolioError::invalid(format!("`{asset}`: {e}")))?;
    let mut noise = Array1::<f64>::random_using(periods, normal, rng);
    if center {
      if let Some(m) = noise.mean() {
        noise -= m;
      }
    }
    columns.push((asset.to_string(), (noise + mean).to_vec()));
  }
  ReturnsMatrix::from_columns(columns)
}

/// Annualized per-asset statistics for one optimization call.
#[derive(Clone, Debug)]
pub struct AssetStatistics {
  assets: Vec<String>,
  mean: Array1<f64>,
  cov: Array2<f64>,
  periods_per_year: f64,
}

impl AssetStatistics {
  /// Wrap externally estimated statistics, validating shapes and the covariance.
  ///
  /// `mean` and `cov` are taken as already annualized with `periods_per_year`.
  pub fn new(
    assets: Vec<String>,
    mean: Array1<f64>,
    cov: Array2<f64>,
    periods_per_year: f64,
  ) -> Result<Self> {
    let n = assets.len();
    if n == 0 {
      return Err(PortfolioError::invalid("no assets"));
    }
    if mean.len() != n || cov.dim() != (n, n) {
      return Err(PortfolioError::invalid(format!(
        "shape mismatch: {n} assets, mean of length {}, covariance {:?}",
        mean.len(),
        cov.dim()
      )));
    }
    if mean.iter().any(|m| !m.is_finite()) {
      return Err(PortfolioError::invalid("mean vector contains non-finite values"));
    }
    check_periods_per_year(periods_per_year)?;
    validate_covariance(&cov)?;

    Ok(Self {
      assets,
      mean,
      cov,
      periods_per_year,
    })
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  /// Annualized mean returns.
  pub fn mean(&self) -> &Array1<f64> {
    &self.mean
  }

  /// Annualized covariance matrix.
  pub fn cov(&self) -> &Array2<f64> {
    &self.cov
  }

  pub fn periods_per_year(&self) -> f64 {
    self.periods_per_year
  }

  pub fn num_assets(&self) -> usize {
    self.assets.len()
  }

  /// Annualized per-asset volatilities.
  pub fn volatilities(&self) -> Array1<f64> {
    self.cov.diag().mapv(|v| v.max(0.0).sqrt())
  }

  /// Pearson correlation implied by the covariance. Zero-variance assets get zero off-diagonal correlation.
  pub fn correlation(&self) -> Array2<f64> {
    let sigmas = self.volatilities();
    let n = self.num_assets();
    Array2::from_shape_fn((n, n), |(i, j)| {
      let denom = sigmas[i] * sigmas[j];
      if i == j {
        1.0
      } else if denom > 1e-15 {
        (self.cov[[i, j]] / denom).clamp(-1.0, 1.0)
      } else {
        0.0
      }
    })
  }
}

fn check_periods_per_year(periods_per_year: f64) -> Result<()> {
  if !periods_per_year.is_finite() || periods_per_year <= 0.0 {
    return Err(PortfolioError::invalid(format!(
      "periods_per_year must be positive and finite, got {periods_per_year}"
    )));
  }
  Ok(())
}

/// Check that `cov` is finite, symmetric and positive-semidefinite.
///
/// Singular (but PSD) matrices are accepted: a zero-variance asset or a
/// redundant asset still gives a well-defined volatility in every direction.
pub fn validate_covariance(cov: &Array2<f64>) -> Result<()> {
  let (n, m) = cov.dim();
  if n != m {
    return Err(PortfolioError::degenerate(format!(
      "covariance is {n}x{m}, expected square"
    )));
  }
  if cov.iter().any(|v| !v.is_finite()) {
    return Err(PortfolioError::degenerate("non-finite covariance entry"));
  }

  let scale = cov.diag().iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
  for i in 0..n {
    for j in (i + 1)..n {
      if (cov[[i, j]] - cov[[j, i]]).abs() > SYMMETRY_TOL * scale {
        return Err(PortfolioError::degenerate(format!(
          "covariance is not symmetric at ({i}, {j})"
        )));
      }
    }
  }

  let sym = DMatrix::from_fn(n, n, |i, j| 0.5 * (cov[[i, j]] + cov[[j, i]]));
  let eigen = SymmetricEigen::new(sym);
  let min_eig = eigen
    .eigenvalues
    .iter()
    .copied()
    .fold(f64::INFINITY, f64::min);

  if !min_eig.is_finite() || min_eig < -PSD_TOL * scale {
    return Err(PortfolioError::degenerate(format!(
      "covariance is not positive-semidefinite (min eigenvalue {min_eig:e})"
    )));
  }

  Ok(())
}

/// Estimate annualized mean and covariance from a returns table.
///
/// The covariance is the unbiased sample estimator; a one-period table yields
/// the zero matrix.
pub fn estimate(returns: &ReturnsMatrix, periods_per_year: f64) -> Result<AssetStatistics> {
  check_periods_per_year(periods_per_year)?;

  let data = returns.data();
  let mean = data
    .mean_axis(Axis(0))
    .ok_or_else(|| PortfolioError::invalid("returns table has no periods"))?;
  // A single period has no dispersion; the population divisor keeps the zero matrix defined.
  let ddof = if returns.num_periods() > 1 { 1.0 } else { 0.0 };
  let cov = data
    .t()
    .cov(ddof)
    .map_err(|_| PortfolioError::invalid("returns table has no periods"))?;

  debug!(
    assets = returns.num_assets(),
    periods = returns.num_periods(),
    periods_per_year,
    "estimated return statistics"
  );

  AssetStatistics::new(
    returns.assets().to_vec(),
    mean * periods_per_year,
    cov * periods_per_year,
    periods_per_year,
  )
}

/// Per-period statistics, i.e. [`estimate`] with a factor of one.
pub fn estimate_raw(returns: &ReturnsMatrix) -> Result<AssetStatistics> {
  estimate(returns, 1.0)
}
