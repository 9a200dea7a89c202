//! Point-estimate development vectors

use super::estimator::{weighted_factor, weighted_sigma, weighted_std_error};
use crate::triangle::{mask_weights, Triangle};
use serde::{Deserialize, Serialize};

/// Development factors with their residual variances and standard errors
///
/// `dev[j]` is the expected incremental loss ratio of the step from
/// development column `j` to `j + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentStatistics {
    /// Weighted mean incremental loss ratio per step
    pub dev: Vec<f64>,

    /// Weighted variance of the loss-ratio residual per step
    pub sigma: Vec<f64>,

    /// Standard deviation of each `dev` estimate
    pub sd: Vec<f64>,
}

impl DevelopmentStatistics {
    /// Estimate all three vectors from a development-ratio triangle
    ///
    /// `ratios` holds the incremental loss ratios of the steps (loss-ratio
    /// columns `1..`), `weights` has the same shape.
    pub fn estimate(ratios: &Triangle, weights: &Triangle, exposure: &[f64]) -> Self {
        let dev = weighted_factor(ratios, weights, exposure);
        Self::with_factors(ratios, weights, exposure, dev)
    }

    /// Use caller-selected factors and estimate `sigma` and `sd` around them
    pub fn with_factors(ratios: &Triangle, weights: &Triangle, exposure: &[f64], dev: Vec<f64>) -> Self {
        let masked = mask_weights(weights, ratios);
        let sigma = weighted_sigma(ratios, &masked, exposure, &dev);
        let sd = weighted_std_error(&sigma, &masked, exposure);
        Self { dev, sigma, sd }
    }

    /// Same factors with all variance removed; every simulated path then
    /// collapses to the deterministic projection
    pub fn zero_variance(&self) -> Self {
        Self {
            dev: self.dev.clone(),
            sigma: vec![0.0; self.sigma.len()],
            sd: vec![0.0; self.sd.len()],
        }
    }

    /// Number of modeled development steps
    pub fn len(&self) -> usize {
        self.dev.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dev.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_estimate_ignores_weights_on_missing_cells() {
        let ratios = Triangle::from_rows(&[vec![0.2, 0.05], vec![0.3]]);
        // Weight of 1 on the unobserved (1, 1) cell must not count
        let weights = Triangle::filled(2, 2, 1.0);
        let stats = DevelopmentStatistics::estimate(&ratios, &weights, &[1.0, 1.0]);

        assert_relative_eq!(stats.dev[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(stats.sigma[0], 0.005, epsilon = 1e-12);
        assert_relative_eq!(stats.sd[0], (0.005_f64 / 2.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.sd[1], 0.005_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_variance_keeps_factors() {
        let stats = DevelopmentStatistics {
            dev: vec![0.4, 0.1],
            sigma: vec![0.02, 0.01],
            sd: vec![0.1, 0.05],
        };
        let flat = stats.zero_variance();

        assert_eq!(flat.dev, stats.dev);
        assert!(flat.sigma.iter().chain(flat.sd.iter()).all(|&v| v == 0.0));
        assert_eq!(flat.len(), 2);
    }
}
