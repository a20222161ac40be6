//! # Portfolio Errors
//!
//! Error taxonomy shared by the estimator, the optimizers and the engine.

use thiserror::Error;

/// Errors raised by portfolio estimation and optimization.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioError {
  /// Malformed returns table or configuration. Raised before any solve.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// Covariance is non-finite, asymmetric or not positive-semidefinite.
  #[error("degenerate covariance matrix: {0}")]
  DegenerateCovariance(String),

  /// Solver stopped before meeting its tolerance.
  #[error("solver did not converge for {objective} after {iterations} iterations")]
  SolverNonConvergence {
    /// Objective that was being minimized.
    objective: String,
    /// Iterations spent before stopping.
    iterations: u64,
  },
}

/// Result alias for portfolio operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;

impl PortfolioError {
  pub(crate) fn invalid(msg: impl Into<String>) -> Self {
    Self::InvalidInput(msg.into())
  }

  pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
    Self::DegenerateCovariance(msg.into())
  }
}
