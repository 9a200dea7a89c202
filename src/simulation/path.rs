//! One stochastic projection of the lower triangle
//!
//! A path receives its development parameters from the batch (`mu`,
//! `sigma_part`) and draws its own process noise:
//! 1. Fill the lower triangle column by column with lognormal loss ratios
//! 2. Record the new diagonal in a shadow loss-ratio triangle, reclassify its
//!    weight and re-estimate the factors feeding the tail fit
//! 3. Extend by tail factors, discount future cashflows, reduce to ultimates

use super::inputs::SimulationInputs;
use super::result::UltimateEstimate;
use crate::development::DevelopmentStatistics;
use crate::error::{ReservingError, Result};
use crate::triangle::{
    build_base_triangle, horizon, mask_unobserved, sum_reverse_diagonal, to_loss_ratio, Triangle,
};
use log::warn;
use rand::Rng;
use rand_distr::{Distribution, LogNormal};

/// Parameter draws for one path, indexed by development step
#[derive(Debug, Clone, Copy)]
pub struct PathDraws<'a> {
    /// Sampled development factor per step
    pub mu: &'a [f64],
    /// Sampled residual variance per step
    pub sigma_part: &'a [f64],
}

/// Weight of a freshly simulated ratio by its distance from the point factor
///
/// 1 within two residual standard deviations, 0.5 within three, 0 beyond.
pub fn residual_weight(ratio: f64, expected: f64, residual_sd: f64) -> f64 {
    let distance = (ratio - expected).abs();
    if distance <= 2.0 * residual_sd {
        1.0
    } else if distance <= 3.0 * residual_sd {
        0.5
    } else {
        0.0
    }
}

/// Draw one incremental loss ratio
///
/// Negative or zero factors are shifted by the prior cumulative ratio so the
/// lognormal stays defined; a shifted mean that is still not positive skips
/// the draw and returns `mu`. So does a mean too small to square in `f64`.
pub fn sample_step_ratio<R: Rng + ?Sized>(mu: f64, variance: f64, prior_ratio: f64, rng: &mut R) -> Result<f64> {
    let shift = if mu > 0.0 { 0.0 } else { prior_ratio };
    let mean = mu + shift;
    if mean <= 0.0 {
        return Ok(mu);
    }

    let mean_sq = mean * mean;
    if mean_sq == 0.0 {
        return Ok(mu);
    }
    let log_mean = (mean_sq / (mean_sq + variance).sqrt()).ln();
    let log_sd = (1.0 + variance / mean_sq).ln().sqrt();
    let lognormal = LogNormal::new(log_mean, log_sd).map_err(|e| {
        ReservingError::Distribution(format!("lognormal(mean {mean}, variance {variance}): {e}"))
    })?;

    Ok(lognormal.sample(rng) - shift)
}

/// Simulated state of one path before the tail
#[derive(Debug)]
struct LowerTriangle {
    cumulative: Triangle,
    /// Observed loss ratios plus the simulated next diagonal
    shadow: Triangle,
    /// Input weights with the new diagonal reclassified
    weights: Triangle,
}

/// Projects paths for one set of validated inputs
///
/// Holds the padded base triangle, the observed loss-ratio triangle and the
/// latest diagonal so that each path only clones them.
#[derive(Debug, Clone)]
pub struct PathSimulator<'a> {
    inputs: &'a SimulationInputs,
    base: Triangle,
    shadow: Triangle,
    latest: f64,
}

impl<'a> PathSimulator<'a> {
    /// `inputs` must have passed [`SimulationInputs::validate`]
    pub fn new(inputs: &'a SimulationInputs) -> Self {
        let n_dev = inputs.n_dev();
        let rows = inputs.rows();

        let mut base = build_base_triangle(&inputs.triangle, n_dev);
        mask_unobserved(&mut base);

        let mut shadow = to_loss_ratio(&inputs.triangle, &inputs.exposure).with_width(n_dev + 1);
        mask_unobserved(&mut shadow);

        let latest = sum_reverse_diagonal(&inputs.triangle.with_width(rows));

        Self {
            inputs,
            base,
            shadow,
            latest,
        }
    }

    /// Sum of the latest observed diagonal
    pub fn latest(&self) -> f64 {
        self.latest
    }

    /// Deterministic projection with the point factors and point tail
    pub fn point_estimate(&self) -> Result<UltimateEstimate> {
        let stats = &self.inputs.statistics;
        let tri = self.projected_triangle(stats)?;
        let (fit, tail) = self.inputs.tail.fit_and_project(stats);
        if !tail.is_empty() && fit.is_degenerate() {
            warn!("tail fit on point factors is degenerate; tail factors are all 1");
        }
        Ok(self.reduce(tri, &tail))
    }

    /// Fully projected cumulative triangle with the point factors, tail
    /// included
    pub fn point_triangle(&self) -> Result<Triangle> {
        let stats = &self.inputs.statistics;
        let tri = self.projected_triangle(stats)?;
        let (_, tail) = self.inputs.tail.fit_and_project(stats);
        Ok(self.extend_with_tail(tri, &tail))
    }

    fn projected_triangle(&self, stats: &DevelopmentStatistics) -> Result<Triangle> {
        let mut tri = self.base.clone();
        self.develop(&mut tri, |_, j, _| Ok(stats.dev[j]))?;
        Ok(tri)
    }

    /// Simulate one path
    pub fn simulate<R: Rng + ?Sized>(&self, draws: &PathDraws<'_>, rng: &mut R) -> Result<UltimateEstimate> {
        let lower = self.simulate_lower(draws, rng)?;
        let tail = self.refit_tail(&lower);
        Ok(self.reduce(lower.cumulative, &tail))
    }

    /// Fill the lower triangle and record the new diagonal with its weights
    fn simulate_lower<R: Rng + ?Sized>(&self, draws: &PathDraws<'_>, rng: &mut R) -> Result<LowerTriangle> {
        let inputs = self.inputs;
        let stats = &inputs.statistics;
        let rows = self.base.rows();

        let mut cumulative = self.base.clone();
        let mut shadow = self.shadow.clone();
        let mut weights = inputs.weights.clone();

        self.develop(&mut cumulative, |i, j, prior| {
            let e = inputs.exposure[i];
            let ratio = sample_step_ratio(draws.mu[j], draws.sigma_part[j] / e, prior / e, &mut *rng)?;

            if horizon::is_next_diagonal_step(rows, i, j) {
                shadow[(i, j + 1)] = ratio;
                let residual_sd = (stats.sigma[j] / e).sqrt();
                weights[(i, j)] = residual_weight(ratio, stats.dev[j], residual_sd);
            }
            Ok(ratio)
        })?;

        Ok(LowerTriangle {
            cumulative,
            shadow,
            weights,
        })
    }

    /// Tail factors of a path, fitted on factors re-estimated with its new
    /// diagonal; empty when no tail is requested
    fn refit_tail(&self, lower: &LowerTriangle) -> Vec<f64> {
        let inputs = self.inputs;
        if inputs.tail.tail_length == 0 {
            return Vec::new();
        }
        let path_stats = DevelopmentStatistics::estimate(&lower.shadow.columns_from(1), &lower.weights, &inputs.exposure);
        inputs.tail.fit_and_project(&path_stats).1
    }

    /// Fill every cell below the latest diagonal, column by column
    ///
    /// `step_ratio(row, step, prior)` returns the incremental loss ratio of
    /// the step from `prior` at column `step`.
    fn develop<F>(&self, tri: &mut Triangle, mut step_ratio: F) -> Result<()>
    where
        F: FnMut(usize, usize, f64) -> Result<f64>,
    {
        let rows = tri.rows();
        let exposure = &self.inputs.exposure;

        for j in 0..self.inputs.n_dev() {
            for i in horizon::first_simulated_row(rows, j)..rows {
                let prior = tri[(i, j)];
                if !prior.is_finite() {
                    continue;
                }
                let ratio = step_ratio(i, j, prior)?;
                tri[(i, j + 1)] = prior + exposure[i] * ratio;
            }
        }
        Ok(())
    }

    /// Append one column per tail factor for every origin period
    fn extend_with_tail(&self, tri: Triangle, tail: &[f64]) -> Triangle {
        if tail.is_empty() {
            return tri;
        }
        let start = tri.cols();
        let mut extended = tri.with_width(start + tail.len());
        for (k, factor) in tail.iter().enumerate() {
            let c = start - 1 + k;
            for i in 0..extended.rows() {
                let prior = extended[(i, c)];
                if prior.is_finite() {
                    extended[(i, c + 1)] = prior + self.inputs.exposure[i] * factor;
                }
            }
        }
        extended
    }

    fn reduce(&self, tri: Triangle, tail: &[f64]) -> UltimateEstimate {
        let extended = self.extend_with_tail(tri, tail);
        let discounted = self.inputs.discount.discount_cumulative(&extended, extended.rows());

        let gross = extended.last_column_sum();
        let gross_discounted = discounted.last_column_sum();
        let net_discounted = self.latest + (gross_discounted - self.latest) * self.inputs.net_to_gross;

        UltimateEstimate {
            gross,
            gross_discounted,
            net_discounted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::raa_inputs;
    use crate::discount::DiscountFactors;
    use crate::tail::TailConfig;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_inputs() -> SimulationInputs {
        let triangle = Triangle::from_rows(&[
            vec![100.0, 150.0, 170.0],
            vec![110.0, 160.0],
            vec![120.0],
        ]);
        SimulationInputs::from_triangle(triangle, vec![1.0, 1.0, 1.0])
    }

    #[test]
    fn test_residual_weight_bands() {
        assert_eq!(residual_weight(1.0, 1.0, 0.1), 1.0);
        assert_eq!(residual_weight(1.2, 1.0, 0.1), 1.0);
        assert_eq!(residual_weight(1.25, 1.0, 0.1), 0.5);
        assert_eq!(residual_weight(0.6, 1.0, 0.1), 0.0);
    }

    #[test]
    fn test_zero_variance_draw_returns_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let ratio = sample_step_ratio(0.4, 0.0, 1.0, &mut rng).unwrap();
        assert_relative_eq!(ratio, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_factor_is_shifted() {
        let mut rng = StdRng::seed_from_u64(7);
        // Shifted mean 1.0 - 0.2 stays positive; zero variance returns mu
        let ratio = sample_step_ratio(-0.2, 0.0, 1.0, &mut rng).unwrap();
        assert_relative_eq!(ratio, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_non_positive_shifted_mean_skips_draw() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(sample_step_ratio(-0.5, 1.0, 0.3, &mut rng).unwrap(), -0.5);
    }

    #[test]
    fn test_lognormal_draws_keep_mean() {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let total: f64 = (0..n)
            .map(|_| sample_step_ratio(2.0, 0.25, 0.0, &mut rng).unwrap())
            .sum();
        assert_relative_eq!(total / n as f64, 2.0, epsilon = 0.02);
    }

    #[test]
    fn test_shifted_lognormal_draws_keep_mean() {
        let mut rng = StdRng::seed_from_u64(13);
        let n = 20_000;
        let draws: Vec<f64> = (0..n)
            .map(|_| sample_step_ratio(-0.2, 0.25, 1.0, &mut rng).unwrap())
            .collect();

        // Lognormal around 0.8, shifted back by the prior ratio
        assert!(draws.iter().all(|&r| r > -1.0));
        assert!(draws.iter().any(|&r| r > 0.0));
        assert_relative_eq!(draws.iter().sum::<f64>() / n as f64, -0.2, epsilon = 0.02);
    }

    #[test]
    fn test_underflowing_mean_skips_draw() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(sample_step_ratio(1e-200, 1.0, 0.0, &mut rng).unwrap(), 1e-200);
        // Shifted mean of 1e-200
        assert_eq!(sample_step_ratio(-1e-200, 1.0, 2e-200, &mut rng).unwrap(), -1e-200);
    }

    #[test]
    fn test_point_estimate_chain_ladder() {
        let inputs = small_inputs();
        let simulator = PathSimulator::new(&inputs);

        // dev = [50, 20]; row 1 adds 20, row 2 adds 70
        let point = simulator.point_estimate().unwrap();
        assert_relative_eq!(simulator.latest(), 170.0 + 160.0 + 120.0);
        assert_relative_eq!(point.gross, 170.0 + 180.0 + 190.0, epsilon = 1e-9);
        assert_relative_eq!(point.gross_discounted, point.gross, epsilon = 1e-9);
        assert_relative_eq!(point.net_discounted, point.gross, epsilon = 1e-9);
    }

    #[test]
    fn test_point_estimate_discount_and_net() {
        let inputs = small_inputs()
            .with_discount(DiscountFactors::from_factors(vec![0.5, 0.25]))
            .with_net_to_gross(0.5);
        let point = PathSimulator::new(&inputs).point_estimate().unwrap();

        // Row 1: 20 at lag 0; row 2: 50 at lag 0 and 20 at lag 1
        let discounted = 170.0 + 160.0 + 10.0 + 120.0 + 25.0 + 5.0;
        assert_relative_eq!(point.gross_discounted, discounted, epsilon = 1e-9);
        assert_relative_eq!(point.net_discounted, 450.0 + (discounted - 450.0) * 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_tail_extends_every_row() {
        let mut inputs = small_inputs();
        inputs.statistics.sd = vec![5.0, 4.0];
        let inputs = inputs.with_tail(TailConfig::all_indices(2, 2));
        let simulator = PathSimulator::new(&inputs);

        let tri = simulator.point_triangle().unwrap();
        assert_eq!(tri.shape(), (3, 5));
        assert!((0..3).all(|i| tri[(i, 4)].is_finite()));
        // Tail increments are the same for every row with unit exposure
        let step = tri[(0, 3)] - tri[(0, 2)];
        assert_relative_eq!(tri[(2, 3)] - tri[(2, 2)], step, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_variance_path_matches_point_estimate() {
        let inputs = small_inputs();
        let simulator = PathSimulator::new(&inputs);
        let mu = inputs.statistics.dev.clone();
        let sigma_part = vec![0.0; mu.len()];
        let draws = PathDraws {
            mu: &mu,
            sigma_part: &sigma_part,
        };

        let mut rng = StdRng::seed_from_u64(1);
        let path = simulator.simulate(&draws, &mut rng).unwrap();
        let point = simulator.point_estimate().unwrap();
        assert_relative_eq!(path.gross, point.gross, epsilon = 1e-9);
    }

    #[test]
    fn test_simulate_leaves_observed_cells() {
        let inputs = small_inputs();
        let simulator = PathSimulator::new(&inputs);
        let mu = vec![50.0, 20.0];
        let sigma_part = vec![100.0, 25.0];
        let draws = PathDraws {
            mu: &mu,
            sigma_part: &sigma_part,
        };

        let mut rng = StdRng::seed_from_u64(3);
        let path = simulator.simulate(&draws, &mut rng).unwrap();
        // Row 0 is fully developed, so the spread comes from rows 1 and 2 only
        assert!(path.is_finite());
        assert!(path.gross > 170.0 + 160.0 + 120.0);
    }

    #[test]
    fn test_zero_variance_path_with_tail_matches_point_estimate() {
        // Two fitted indices: the refitted line passes through both factors
        // whatever their precision weights
        let tail = TailConfig {
            inclusion: vec![2, 3],
            tail_length: 3,
            ..Default::default()
        };
        let inputs = raa_inputs()
            .with_tail(tail)
            .with_discount(DiscountFactors::from_annual_rate(0.03, 12))
            .with_net_to_gross(0.8);
        let simulator = PathSimulator::new(&inputs);
        let rows = inputs.rows();

        let mu = inputs.statistics.dev.clone();
        let sigma_part = vec![0.0; mu.len()];
        let draws = PathDraws {
            mu: &mu,
            sigma_part: &sigma_part,
        };
        let mut rng = StdRng::seed_from_u64(1);

        let lower = simulator.simulate_lower(&draws, &mut rng).unwrap();
        for j in 0..inputs.n_dev() {
            assert_relative_eq!(lower.shadow[(rows - 1 - j, j + 1)], mu[j], max_relative = 1e-12);
            assert_eq!(lower.weights[(rows - 1 - j, j)], 1.0);
        }

        let (fit, point_tail) = inputs.tail.fit_and_project(&inputs.statistics);
        assert!(!fit.is_degenerate());
        let path_tail = simulator.refit_tail(&lower);
        assert_eq!(path_tail.len(), 3);
        for (path, point) in path_tail.iter().zip(&point_tail) {
            assert_relative_eq!(*path, *point, max_relative = 1e-9);
        }

        assert_eq!(simulator.point_triangle().unwrap().cols(), inputs.n_dev() + 4);
        let path = simulator.simulate(&draws, &mut rng).unwrap();
        let point = simulator.point_estimate().unwrap();
        assert_relative_eq!(path.gross, point.gross, max_relative = 1e-9);
        assert_relative_eq!(path.gross_discounted, point.gross_discounted, max_relative = 1e-9);
        assert_relative_eq!(path.net_discounted, point.net_discounted, max_relative = 1e-9);
    }

    #[test]
    fn test_outlying_draw_drops_out_of_tail_refit() {
        let inputs = raa_inputs().with_tail(TailConfig::all_indices(9, 5));
        let simulator = PathSimulator::new(&inputs);
        let stats = &inputs.statistics;
        let rows = inputs.rows();
        let n_dev = inputs.n_dev();

        // Every step drawn `k` residual standard deviations above its factor
        let offset = |k: f64| -> Vec<f64> {
            stats.dev.iter().zip(&stats.sigma).map(|(d, s)| d + k * s.sqrt()).collect()
        };
        let sigma_part = vec![0.0; n_dev];
        let mut rng = StdRng::seed_from_u64(5);
        let (_, point_tail) = inputs.tail.fit_and_project(stats);

        let far = offset(10.0);
        let far_draws = PathDraws {
            mu: &far,
            sigma_part: &sigma_part,
        };
        let lower = simulator.simulate_lower(&far_draws, &mut rng).unwrap();
        assert!((0..n_dev).all(|j| lower.weights[(rows - 1 - j, j)] == 0.0));
        let far_tail = simulator.refit_tail(&lower);
        for (path, point) in far_tail.iter().zip(&point_tail) {
            assert_relative_eq!(*path, *point, max_relative = 1e-12);
        }

        let near = offset(2.5);
        let near_draws = PathDraws {
            mu: &near,
            sigma_part: &sigma_part,
        };
        let lower = simulator.simulate_lower(&near_draws, &mut rng).unwrap();
        assert!((0..n_dev).all(|j| lower.weights[(rows - 1 - j, j)] == 0.5));
        let near_tail = simulator.refit_tail(&lower);
        assert_eq!(near_tail.len(), 5);
        assert!(near_tail
            .iter()
            .zip(&far_tail)
            .any(|(near, far)| (near - far).abs() > 1e-9 * far.abs()));
    }
}
