//! # mpt-rs
//!
//! $$
//! \max_{\mathbf{w}\in\Delta}\ \frac{\mathbf{w}^\top\mu-r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! \qquad
//! \min_{\mathbf{w}\in\Delta}\ \sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}
//! $$
//!
//! Modern portfolio theory optimizer for long-only, fully invested portfolios.

pub mod portfolio;

pub use portfolio::optimize_portfolio;
pub use portfolio::PortfolioConfig;
pub use portfolio::PortfolioError;
pub use portfolio::PortfolioReport;
pub use portfolio::ReturnsMatrix;
