//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Mean-variance estimation, max-ratio and min-volatility optimization, and
//! random frontier sampling.

pub mod data;
pub mod engine;
pub mod error;
pub mod frontier;
pub mod metrics;
pub mod optimizers;
pub mod types;

pub use data::estimate;
pub use data::estimate_raw;
pub use data::log_returns;
pub use data::simple_returns;
pub use data::synthetic_returns;
pub use data::validate_covariance;
pub use data::AssetStatistics;
pub use engine::assemble;
pub use engine::optimize_portfolio;
pub use engine::PortfolioConfig;
pub use engine::PortfolioEngine;
pub use error::PortfolioError;
pub use frontier::frontier_extremes;
pub use frontier::sample_frontier;
pub use frontier::sample_frontier_par;
pub use frontier::FrontierSampler;
pub use metrics::metrics_for;
pub use metrics::portfolio_metrics;
pub use metrics::NegativeRatio;
pub use metrics::PortfolioObjective;
pub use metrics::Volatility;
pub use optimizers::optimize;
pub use optimizers::SolverOutcome;
pub use optimizers::SolverSettings;
pub use optimizers::WeightConstraints;
pub use types::AssetWeight;
pub use types::FrontierSample;
pub use types::OptimizationResult;
pub use types::PortfolioMetrics;
pub use types::PortfolioReport;
pub use types::ReturnsMatrix;
pub use types::SolverMethod;
pub use types::SolverReport;
pub use types::SolverStatus;
