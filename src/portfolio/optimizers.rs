//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf{w}} f(\mathbf{w})\quad\text{s.t.}\quad \mathbf{1}^\top\mathbf{w}=b,\ \ l\le w_i\le u
//! $$
//!
//! Budget- and bound-constrained minimization of a [`PortfolioObjective`].
//!
//! The default solver is a spectral projected gradient method: Barzilai-Borwein
//! trial steps, Armijo backtracking along the projection arc, and an exact
//! Euclidean projection onto the feasible set. Every iterate is feasible and the
//! objective never increases, so the returned point is always the best iterate.
//! A derivative-free Nelder-Mead alternative runs on a softmax parameterization.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use argmin::solver::neldermead::NelderMead;
use impl_new_derive::ImplNew;
use tracing::debug;
use tracing::warn;

use super::error::PortfolioError;
use super::error::Result;
use super::metrics::PortfolioObjective;
use super::types::SolverMethod;
use super::types::SolverReport;
use super::types::SolverStatus;

const ARMIJO_C: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 60;
const MIN_STEP: f64 = 1e-12;
const MAX_STEP: f64 = 1e12;
const PROJECTION_ITERS: usize = 200;

/// Budget equality plus per-asset box bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightConstraints {
  /// Required sum of weights.
  pub budget: f64,
  /// Lower bound for every weight.
  pub lower: f64,
  /// Upper bound for every weight.
  pub upper: f64,
}

impl Default for WeightConstraints {
  fn default() -> Self {
    Self::long_only()
  }
}

impl WeightConstraints {
  /// Fully invested, no leverage, no short-selling: `sum(w) = 1`, `0 <= w_i <= 1`.
  pub fn long_only() -> Self {
    Self {
      budget: 1.0,
      lower: 0.0,
      upper: 1.0,
    }
  }

  /// Check that the feasible set for `n` assets is non-empty.
  pub fn validate(&self, n: usize) -> Result<()> {
    if n == 0 {
      return Err(PortfolioError::invalid("no assets to allocate"));
    }
    if !(self.budget.is_finite() && self.lower.is_finite() && self.upper.is_finite()) {
      return Err(PortfolioError::invalid("constraints must be finite"));
    }
    if self.lower > self.upper {
      return Err(PortfolioError::invalid(format!(
        "lower bound {} exceeds upper bound {}",
        self.lower, self.upper
      )));
    }
    let nf = n as f64;
    let slack = 1e-12 * (1.0 + self.budget.abs());
    if nf * self.lower > self.budget + slack || nf * self.upper < self.budget - slack {
      return Err(PortfolioError::invalid(format!(
        "budget {} unreachable with {n} assets in [{}, {}]",
        self.budget, self.lower, self.upper
      )));
    }
    Ok(())
  }

  /// Whether `w` satisfies the budget and bounds within `tol`.
  pub fn is_feasible(&self, w: &[f64], tol: f64) -> bool {
    let sum: f64 = w.iter().sum();
    (sum - self.budget).abs() <= tol
      && w
        .iter()
        .all(|&x| x.is_finite() && x >= self.lower - tol && x <= self.upper + tol)
  }

  /// Equal allocation, projected in case the bounds exclude it.
  pub fn initial_point(&self, n: usize) -> Vec<f64> {
    self.project(&vec![self.budget / n as f64; n])
  }

  /// Euclidean projection of `v` onto the feasible set.
  ///
  /// The projection is `clamp(v_i - tau, lower, upper)` for the unique shift
  /// `tau` meeting the budget; `tau` is found by bisection.
  pub fn project(&self, v: &[f64]) -> Vec<f64> {
    if v.is_empty() {
      return Vec::new();
    }

    let clamped_sum = |tau: f64| -> f64 {
      v.iter()
        .map(|&x| (x - tau).clamp(self.lower, self.upper))
        .sum()
    };

    let v_min = v.iter().copied().fold(f64::INFINITY, f64::min);
    let v_max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut lo = v_min - self.upper;
    let mut hi = v_max - self.lower;

    for _ in 0..PROJECTION_ITERS {
      let mid = 0.5 * (lo + hi);
      if clamped_sum(mid) > self.budget {
        lo = mid;
      } else {
        hi = mid;
      }
      if hi - lo <= f64::EPSILON * (1.0 + lo.abs().max(hi.abs())) {
        break;
      }
    }

    let tau = 0.5 * (lo + hi);
    let mut w: Vec<f64> = v
      .iter()
      .map(|&x| (x - tau).clamp(self.lower, self.upper))
      .collect();

    // Spread the bisection residual over coordinates strictly inside the box.
    let residual = self.budget - w.iter().sum::<f64>();
    let free: Vec<usize> = (0..w.len())
      .filter(|&i| w[i] > self.lower && w[i] < self.upper)
      .collect();
    if residual != 0.0 && !free.is_empty() {
      let share = residual / free.len() as f64;
      for i in free {
        w[i] = (w[i] + share).clamp(self.lower, self.upper);
      }
    }

    w
  }
}

/// Solver selection and stopping rules.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
  pub method: SolverMethod,
  /// Iteration cap; the only bound on solver run time.
  pub max_iterations: u64,
  /// Stationarity tolerance (projected gradient) or simplex spread (Nelder-Mead).
  pub tolerance: f64,
  /// Stationarity accepted as converged once the line search can no longer
  /// decrease the objective. Values below `tolerance` are raised to it.
  pub stall_tolerance: f64,
}

impl Default for SolverSettings {
  fn default() -> Self {
    Self {
      method: SolverMethod::ProjectedGradient,
      max_iterations: 1000,
      tolerance: 1e-9,
      stall_tolerance: 1e-6,
    }
  }
}

impl SolverSettings {
  pub fn validate(&self) -> Result<()> {
    if self.max_iterations == 0 {
      return Err(PortfolioError::invalid("solver_max_iterations must be positive"));
    }
    if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
      return Err(PortfolioError::invalid(format!(
        "solver_tolerance must be positive and finite, got {}",
        self.tolerance
      )));
    }
    if !self.stall_tolerance.is_finite() || self.stall_tolerance <= 0.0 {
      return Err(PortfolioError::invalid(format!(
        "solver_stall_tolerance must be positive and finite, got {}",
        self.stall_tolerance
      )));
    }
    Ok(())
  }
}

/// Best weights found plus solver diagnostics.
#[derive(Clone, Debug)]
pub struct SolverOutcome {
  pub weights: Vec<f64>,
  pub report: SolverReport,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
  a.iter().zip(b.iter()).map(|(x, y)| x - y).collect()
}

fn max_abs(v: &[f64]) -> f64 {
  v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

fn finite_cost<O: PortfolioObjective>(objective: &O, w: &Vec<f64>) -> Option<f64> {
  objective.cost(w).ok().filter(|c| c.is_finite())
}

fn finite_gradient<O: PortfolioObjective>(objective: &O, w: &Vec<f64>) -> Option<Vec<f64>> {
  objective
    .gradient(w)
    .ok()
    .filter(|g| g.iter().all(|x| x.is_finite()))
}

/// `max_i |w_i - P(w - g)_i|`, zero exactly at KKT points.
fn stationarity(w: &[f64], g: &[f64], constraints: &WeightConstraints) -> f64 {
  let moved = constraints.project(&sub(w, g));
  max_abs(&sub(w, &moved))
}

/// Minimize `objective` over `num_assets` weights subject to `constraints`.
///
/// Starts from the equal-weight portfolio. Non-convergence is reported through
/// [`SolverReport::status`], never by discarding the best iterate.
pub fn optimize<O: PortfolioObjective>(
  objective: &O,
  num_assets: usize,
  constraints: &WeightConstraints,
  settings: &SolverSettings,
) -> Result<SolverOutcome> {
  constraints.validate(num_assets)?;
  settings.validate()?;

  if num_assets == 1 {
    let weights = vec![constraints.budget];
    let objective_value = objective.cost(&weights).unwrap_or(f64::NAN);
    let status = if objective_value.is_finite() {
      SolverStatus::Converged
    } else {
      SolverStatus::NumericalFailure
    };
    return Ok(SolverOutcome {
      weights,
      report: SolverReport {
        objective: objective.name(),
        method: settings.method,
        status,
        iterations: 0,
        objective_value,
      },
    });
  }

  let outcome = match settings.method {
    SolverMethod::ProjectedGradient => projected_gradient(objective, num_assets, constraints, settings),
    SolverMethod::NelderMead => nelder_mead(objective, num_assets, constraints, settings),
  };

  let report = &outcome.report;
  if report.status.is_converged() {
    debug!(
      objective = report.objective,
      method = %report.method,
      iterations = report.iterations,
      value = report.objective_value,
      "solver converged"
    );
  } else {
    warn!(
      objective = report.objective,
      method = %report.method,
      status = ?report.status,
      iterations = report.iterations,
      "solver did not converge, returning best iterate"
    );
  }

  Ok(outcome)
}

fn projected_gradient<O: PortfolioObjective>(
  objective: &O,
  n: usize,
  constraints: &WeightConstraints,
  settings: &SolverSettings,
) -> SolverOutcome {
  let tol = settings.tolerance;
  let stall_tol = settings.stall_tolerance.max(tol);
  let mut x = constraints.initial_point(n);

  let report = |status: SolverStatus, iterations: u64, value: f64| SolverReport {
    objective: objective.name(),
    method: SolverMethod::ProjectedGradient,
    status,
    iterations,
    objective_value: value,
  };

  let (mut fx, mut gx) = match (finite_cost(objective, &x), finite_gradient(objective, &x)) {
    (Some(f), Some(g)) => (f, g),
    (f, _) => {
      let value = f.unwrap_or(f64::NAN);
      return SolverOutcome {
        weights: x,
        report: report(SolverStatus::NumericalFailure, 0, value),
      };
    }
  };

  let mut step = 1.0;
  let mut iterations = 0_u64;
  let mut status = SolverStatus::MaxIterationsReached;

  while iterations < settings.max_iterations {
    let pg = stationarity(&x, &gx, constraints);
    if pg <= tol {
      status = SolverStatus::Converged;
      break;
    }

    let mut t = step;
    let mut accepted = None;
    let mut improved = false;
    for _ in 0..MAX_BACKTRACKS {
      let shifted: Vec<f64> = x.iter().zip(gx.iter()).map(|(xi, gi)| xi - t * gi).collect();
      let trial = constraints.project(&shifted);
      let decrease = dot(&gx, &sub(&trial, &x));
      if let Some(ft) = finite_cost(objective, &trial) {
        improved |= ft < fx;
        if ft <= fx + ARMIJO_C * decrease {
          accepted = Some((trial, ft));
          break;
        }
      }
      t *= 0.5;
    }

    let stalled_status = if pg <= stall_tol {
      SolverStatus::Converged
    } else {
      SolverStatus::Stalled
    };

    let Some((x_new, f_new)) = accepted else {
      // On a kink with no better point along the arc, x is a local minimum.
      status = if !improved && objective.is_kink(&x) {
        SolverStatus::Converged
      } else {
        stalled_status
      };
      break;
    };

    let s = sub(&x_new, &x);
    if max_abs(&s) <= f64::EPSILON || fx - f_new <= 4.0 * f64::EPSILON * (1.0 + fx.abs()) {
      // Progress is below floating-point resolution of the objective.
      if f_new < fx {
        x = x_new;
        fx = f_new;
        iterations += 1;
      }
      status = stalled_status;
      break;
    }

    let Some(g_new) = finite_gradient(objective, &x_new) else {
      x = x_new;
      fx = f_new;
      iterations += 1;
      status = SolverStatus::NumericalFailure;
      break;
    };

    let y = sub(&g_new, &gx);
    let sy = dot(&s, &y);
    step = if sy > 0.0 {
      (dot(&s, &s) / sy).clamp(MIN_STEP, MAX_STEP)
    } else {
      MAX_STEP
    };

    x = x_new;
    fx = f_new;
    gx = g_new;
    iterations += 1;
  }

  if status == SolverStatus::MaxIterationsReached && stationarity(&x, &gx, constraints) <= tol {
    status = SolverStatus::Converged;
  }

  SolverOutcome {
    weights: x,
    report: report(status, iterations, fx),
  }
}

/// Objective composed with `w = P(b * softmax(x))`, feasible for every `x`.
#[derive(Clone)]
struct SoftmaxCost<O> {
  objective: O,
  constraints: WeightConstraints,
}

impl<O> SoftmaxCost<O> {
  fn weights(&self, x: &[f64]) -> Vec<f64> {
    let scaled: Vec<f64> = softmax(x)
      .into_iter()
      .map(|v| v * self.constraints.budget)
      .collect();
    self.constraints.project(&scaled)
  }
}

impl<O: PortfolioObjective> CostFunction for SoftmaxCost<O> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let value = self.objective.cost(&self.weights(x))?;
    Ok(if value.is_finite() { value } else { f64::INFINITY })
  }
}

fn nelder_mead<O: PortfolioObjective>(
  objective: &O,
  n: usize,
  constraints: &WeightConstraints,
  settings: &SolverSettings,
) -> SolverOutcome {
  let cost = SoftmaxCost {
    objective: objective.clone(),
    constraints: *constraints,
  };

  // x0 = 0 maps to the equal-weight portfolio.
  let x0 = vec![0.0; n];
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] = 1.0;
    simplex.push(point);
  }

  let fallback = |status: SolverStatus| {
    let weights = cost.weights(&x0);
    let objective_value = finite_cost(objective, &weights).unwrap_or(f64::NAN);
    SolverOutcome {
      weights,
      report: SolverReport {
        objective: objective.name(),
        method: SolverMethod::NelderMead,
        status,
        iterations: 0,
        objective_value,
      },
    }
  };

  let solver = match NelderMead::new(simplex).with_sd_tolerance(settings.tolerance) {
    Ok(solver) => solver,
    Err(err) => {
      warn!(%err, "could not set up Nelder-Mead");
      return fallback(SolverStatus::NumericalFailure);
    }
  };

  let res = match Executor::new(cost.clone(), solver)
    .configure(|state| state.max_iters(settings.max_iterations))
    .run()
  {
    Ok(res) => res,
    Err(err) => {
      warn!(%err, "Nelder-Mead run failed");
      return fallback(SolverStatus::NumericalFailure);
    }
  };

  let best_x = res.state.best_param.clone().unwrap_or(x0);
  let weights = cost.weights(&best_x);
  let objective_value = finite_cost(objective, &weights).unwrap_or(f64::NAN);

  let status = if !objective_value.is_finite() {
    SolverStatus::NumericalFailure
  } else {
    match res.state.termination_status {
      TerminationStatus::Terminated(TerminationReason::SolverConverged) => SolverStatus::Converged,
      TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
        SolverStatus::MaxIterationsReached
      }
      _ => SolverStatus::Stalled,
    }
  };

  SolverOutcome {
    weights,
    report: SolverReport {
      objective: objective.name(),
      method: SolverMethod::NelderMead,
      status,
      iterations: res.state.iter,
      objective_value,
    },
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;
  use ndarray::array;
  use tracing_test::traced_test;

  use super::*;
  use crate::portfolio::data::AssetStatistics;
  use crate::portfolio::metrics::metrics_for;
  use crate::portfolio::metrics::NegativeRatio;
  use crate::portfolio::metrics::Volatility;

  fn three_assets() -> AssetStatistics {
    AssetStatistics::new(
      vec!["A".into(), "B".into(), "C".into()],
      array![0.08, 0.10, 0.12],
      array![[0.04, 0.01, 0.0], [0.01, 0.09, 0.02], [0.0, 0.02, 0.16]],
      252.0,
    )
    .unwrap()
  }

  fn uncorrelated(vars: &[f64], mean: &[f64]) -> AssetStatistics {
    let n = vars.len();
    let mut cov = ndarray::Array2::zeros((n, n));
    for (i, v) in vars.iter().enumerate() {
      cov[[i, i]] = *v;
    }
    AssetStatistics::new(
      (0..n).map(|i| format!("X{i}")).collect(),
      ndarray::Array1::from(mean.to_vec()),
      cov,
      252.0,
    )
    .unwrap()
  }

  #[test]
  fn projection_lands_on_simplex() {
    let c = WeightConstraints::long_only();
    for v in [
      vec![0.5, 0.5, 0.5],
      vec![3.0, -1.0, 0.2, 0.0],
      vec![-5.0, -6.0],
      vec![1e6, 0.0, 0.0],
    ] {
      let w = c.project(&v);
      assert!(c.is_feasible(&w, 1e-12), "{v:?} -> {w:?}");
    }
  }

  #[test]
  fn projection_is_identity_on_feasible_points() {
    let c = WeightConstraints::long_only();
    let w = vec![0.2, 0.3, 0.5];
    let p = c.project(&w);
    for (a, b) in w.iter().zip(p.iter()) {
      assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
  }

  #[test]
  fn projection_matches_known_value() {
    // sorted-threshold projection of (0.8, 0.6, -0.2) onto the simplex is (0.6, 0.4, 0.0)
    let w = WeightConstraints::long_only().project(&[0.8, 0.6, -0.2]);
    assert_abs_diff_eq!(w[0], 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(w[1], 0.4, epsilon = 1e-12);
    assert_abs_diff_eq!(w[2], 0.0, epsilon = 1e-12);
  }

  #[test]
  fn projection_honours_tighter_bounds() {
    let c = WeightConstraints {
      budget: 1.0,
      lower: 0.1,
      upper: 0.5,
    };
    let w = c.project(&[1.0, 0.0, 0.0, 0.0]);
    assert!(c.is_feasible(&w, 1e-12));
    assert_abs_diff_eq!(w[0], 0.5, epsilon = 1e-12);
  }

  #[test]
  fn constraint_validation_rejects_empty_feasible_set() {
    let c = WeightConstraints {
      budget: 1.0,
      lower: 0.0,
      upper: 0.2,
    };
    assert!(c.validate(4).is_err());
    assert!(c.validate(5).is_ok());
    assert!(WeightConstraints::long_only().validate(0).is_err());
  }

  #[test]
  fn min_volatility_matches_inverse_variance_weights() {
    // uncorrelated assets: w_i proportional to 1 / var_i
    let stats = uncorrelated(&[0.04, 0.09, 0.16], &[0.05, 0.05, 0.05]);
    let out = optimize(
      &Volatility::new(&stats),
      3,
      &WeightConstraints::long_only(),
      &SolverSettings::default(),
    )
    .unwrap();

    let inv: Vec<f64> = [0.04, 0.09, 0.16].iter().map(|v| 1.0 / v).collect();
    let total: f64 = inv.iter().sum();
    assert!(out.report.status.is_converged());
    for (w, i) in out.weights.iter().zip(inv.iter()) {
      assert_abs_diff_eq!(*w, i / total, epsilon = 1e-5);
    }
  }

  #[test]
  fn max_ratio_matches_unconstrained_tangent_when_interior() {
    // uncorrelated: tangent weights proportional to (mu_i - rf) / var_i, all positive here
    let mean = [0.10, 0.12, 0.08];
    let vars = [0.04, 0.09, 0.02];
    let rf = 0.02;
    let stats = uncorrelated(&vars, &mean);
    let out = optimize(
      &NegativeRatio::new(&stats, rf),
      3,
      &WeightConstraints::long_only(),
      &SolverSettings::default(),
    )
    .unwrap();

    let raw: Vec<f64> = mean.iter().zip(vars.iter()).map(|(m, v)| (m - rf) / v).collect();
    let total: f64 = raw.iter().sum();
    for (w, r) in out.weights.iter().zip(raw.iter()) {
      assert_abs_diff_eq!(*w, r / total, epsilon = 1e-4);
    }
  }

  #[test]
  fn max_ratio_hits_the_boundary_when_an_asset_is_dominated() {
    // C earns less than the risk-free rate and is uncorrelated; it must be excluded
    let stats = uncorrelated(&[0.04, 0.04, 0.25], &[0.12, 0.10, 0.01]);
    let out = optimize(
      &NegativeRatio::new(&stats, 0.02),
      3,
      &WeightConstraints::long_only(),
      &SolverSettings::default(),
    )
    .unwrap();

    assert_abs_diff_eq!(out.weights[2], 0.0, epsilon = 1e-8);
    assert!(WeightConstraints::long_only().is_feasible(&out.weights, 1e-9));
  }

  #[test]
  fn optimizers_improve_on_equal_weights() {
    let stats = three_assets();
    let eq = vec![1.0 / 3.0; 3];
    let eq_metrics = metrics_for(&eq, &stats, 0.02);
    let c = WeightConstraints::long_only();

    for method in [SolverMethod::ProjectedGradient, SolverMethod::NelderMead] {
      let settings = SolverSettings::new(method, 5000, 1e-10, 1e-6);

      let max_ratio = optimize(&NegativeRatio::new(&stats, 0.02), 3, &c, &settings).unwrap();
      let min_vol = optimize(&Volatility::new(&stats), 3, &c, &settings).unwrap();

      assert!(c.is_feasible(&max_ratio.weights, 1e-6), "{method}");
      assert!(c.is_feasible(&min_vol.weights, 1e-6), "{method}");
      assert!(metrics_for(&max_ratio.weights, &stats, 0.02).ratio >= eq_metrics.ratio - 1e-12);
      assert!(metrics_for(&min_vol.weights, &stats, 0.02).volatility <= eq_metrics.volatility + 1e-12);
    }
  }

  #[test]
  fn nelder_mead_agrees_with_projected_gradient() {
    let stats = three_assets();
    let c = WeightConstraints::long_only();
    let objective = Volatility::new(&stats);

    let pg = optimize(&objective, 3, &c, &SolverSettings::default()).unwrap();
    let nm = optimize(
      &objective,
      3,
      &c,
      &SolverSettings::new(SolverMethod::NelderMead, 20_000, 1e-12, 1e-6),
    )
    .unwrap();

    assert_relative_eq!(
      pg.report.objective_value,
      nm.report.objective_value,
      max_relative = 1e-4
    );
  }

  #[test]
  fn single_asset_is_fully_allocated() {
    let stats = uncorrelated(&[0.04], &[0.07]);
    let out = optimize(
      &NegativeRatio::new(&stats, 0.02),
      1,
      &WeightConstraints::long_only(),
      &SolverSettings::default(),
    )
    .unwrap();

    assert_eq!(out.weights, vec![1.0]);
    assert_eq!(out.report.iterations, 0);
    assert!(out.report.status.is_converged());
  }

  #[test]
  fn invalid_settings_are_rejected() {
    let stats = three_assets();
    let objective = Volatility::new(&stats);
    let c = WeightConstraints::long_only();

    let zero_iters = SolverSettings::new(SolverMethod::ProjectedGradient, 0, 1e-9, 1e-6);
    assert!(matches!(
      optimize(&objective, 3, &c, &zero_iters),
      Err(PortfolioError::InvalidInput(_))
    ));

    let bad_tol = SolverSettings::new(SolverMethod::ProjectedGradient, 10, -1.0, 1e-6);
    assert!(optimize(&objective, 3, &c, &bad_tol).is_err());

    let bad_stall = SolverSettings::new(SolverMethod::ProjectedGradient, 10, 1e-9, f64::NAN);
    assert!(matches!(
      optimize(&objective, 3, &c, &bad_stall),
      Err(PortfolioError::InvalidInput(_))
    ));
  }

  #[traced_test]
  #[test]
  fn iteration_cap_is_flagged_and_logged() {
    let stats = three_assets();
    let settings = SolverSettings::new(SolverMethod::ProjectedGradient, 1, 1e-14, 1e-14);
    let out = optimize(
      &NegativeRatio::new(&stats, 0.02),
      3,
      &WeightConstraints::long_only(),
      &settings,
    )
    .unwrap();

    assert_eq!(out.report.status, SolverStatus::MaxIterationsReached);
    assert_eq!(out.report.iterations, 1);
    assert!(WeightConstraints::long_only().is_feasible(&out.weights, 1e-9));
    assert!(logs_contain("solver did not converge"));
  }

  #[test]
  fn stall_status_honours_stall_tolerance() {
    // tolerance below floating-point reach
    let stats = three_assets();
    let objective = NegativeRatio::new(&stats, 0.02);
    let c = WeightConstraints::long_only();
    let settings = SolverSettings::new(SolverMethod::ProjectedGradient, 10_000, 1e-15, 1e-15);
    let out = optimize(&objective, 3, &c, &settings).unwrap();

    let pg = stationarity(&out.weights, &objective.grad(&out.weights), &c);
    if out.report.status.is_converged() {
      assert!(pg <= 1e-15, "converged with stationarity {pg}");
    }
    assert_ne!(out.report.status, SolverStatus::NumericalFailure);
    assert_eq!(SolverSettings::default().stall_tolerance, 1e-6);
  }

  #[test]
  fn max_ratio_converges_at_zero_volatility_vertex() {
    // riskless asset above the risk-free rate: the smoothed ratio peaks at the cash vertex
    let stats = AssetStatistics::new(
      vec!["CASH".into(), "EQ".into()],
      array![0.03, 0.10],
      array![[0.0, 0.0], [0.0, 0.04]],
      252.0,
    )
    .unwrap();
    let out = optimize(
      &NegativeRatio::new(&stats, 0.02),
      2,
      &WeightConstraints::long_only(),
      &SolverSettings::default(),
    )
    .unwrap();

    assert_abs_diff_eq!(out.weights[0], 1.0, epsilon = 1e-12);
    assert_eq!(out.report.status, SolverStatus::Converged);
  }

  #[test]
  fn runs_are_deterministic() {
    let stats = three_assets();
    let objective = NegativeRatio::new(&stats, 0.02);
    let c = WeightConstraints::long_only();
    let a = optimize(&objective, 3, &c, &SolverSettings::default()).unwrap();
    let b = optimize(&objective, 3, &c, &SolverSettings::default()).unwrap();
    assert_eq!(a.weights, b.weights);
    assert_eq!(a.report, b.report);
  }
}
