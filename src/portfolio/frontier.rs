//! # Frontier Sampling
//!
//! $$
//! \mathbf{w}=\frac{\mathbf{u}}{\mathbf{1}^\top\mathbf{u}},\qquad u_i\overset{iid}{\sim}\mathcal U[0,1)
//! $$
//!
//! Monte-Carlo approximation of the efficient frontier by random long-only portfolios.
//!
//! Normalized uniform draws are **not** uniform on the simplex: they concentrate
//! around the equal-weight point and under-sample the vertices and edges (a flat
//! Dirichlet would need exponential draws). Samples are diagnostic only and are
//! never fed back into the optimizers.

use ndarray::Array1;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::Uniform;
use rayon::prelude::*;

use super::data::AssetStatistics;
use super::metrics::metrics_for;
use super::types::FrontierSample;

fn draw_sample<R: Rng + ?Sized>(
  stats: &AssetStatistics,
  risk_free_rate: f64,
  rng: &mut R,
) -> FrontierSample {
  let n = stats.num_assets();
  let raw = Array1::<f64>::random_using(n, Uniform::new(0.0, 1.0), rng);
  let total = raw.sum();

  let weights: Vec<f64> = if total > 1e-15 {
    raw.iter().map(|&u| u / total).collect()
  } else {
    vec![1.0 / n as f64; n]
  };

  let metrics = metrics_for(&weights, stats, risk_free_rate);
  FrontierSample { weights, metrics }
}

/// Lazy, finite stream of random frontier samples.
///
/// Yields exactly `num_samples` items and cannot be restarted; reseed the RNG
/// and build a new sampler to replay a sequence.
pub struct FrontierSampler<'a, R: Rng> {
  stats: &'a AssetStatistics,
  risk_free_rate: f64,
  remaining: usize,
  rng: R,
}

impl<'a, R: Rng> FrontierSampler<'a, R> {
  pub fn new(stats: &'a AssetStatistics, risk_free_rate: f64, num_samples: usize, rng: R) -> Self {
    Self {
      stats,
      risk_free_rate,
      remaining: num_samples,
      rng,
    }
  }
}

impl<R: Rng> Iterator for FrontierSampler<'_, R> {
  type Item = FrontierSample;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    Some(draw_sample(self.stats, self.risk_free_rate, &mut self.rng))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl<R: Rng> ExactSizeIterator for FrontierSampler<'_, R> {}

/// Collect `num_samples` frontier samples from `rng`.
pub fn sample_frontier<R: Rng>(
  stats: &AssetStatistics,
  risk_free_rate: f64,
  num_samples: usize,
  rng: R,
) -> Vec<FrontierSample> {
  FrontierSampler::new(stats, risk_free_rate, num_samples, rng).collect()
}

fn sample_seed(seed: u64, i: usize) -> u64 {
  // splitmix64 finalizer so neighbouring indices get unrelated streams
  let mut z = seed.wrapping_add((i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
  z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
  z ^ (z >> 31)
}

/// Parallel sampler; sample `i` draws from its own `StdRng` derived from `seed` and `i`.
///
/// The output is identical for a fixed seed regardless of thread count.
pub fn sample_frontier_par(
  stats: &AssetStatistics,
  risk_free_rate: f64,
  num_samples: usize,
  seed: u64,
) -> Vec<FrontierSample> {
  (0..num_samples)
    .into_par_iter()
    .map(|i| {
      let mut rng = StdRng::seed_from_u64(sample_seed(seed, i));
      draw_sample(stats, risk_free_rate, &mut rng)
    })
    .collect()
}

/// Highest-ratio and lowest-volatility samples, in that order.
pub fn frontier_extremes(
  samples: &[FrontierSample],
) -> Option<(&FrontierSample, &FrontierSample)> {
  let best_ratio = samples
    .iter()
    .max_by(|a, b| a.metrics.ratio.total_cmp(&b.metrics.ratio))?;
  let min_vol = samples
    .iter()
    .min_by(|a, b| a.metrics.volatility.total_cmp(&b.metrics.volatility))?;
  Some((best_ratio, min_vol))
}
