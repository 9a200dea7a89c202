//! Validated bundle of everything a simulation run reads

use crate::development::DevelopmentStatistics;
use crate::discount::DiscountFactors;
use crate::error::{ReservingError, Result};
use crate::tail::TailConfig;
use crate::triangle::{horizon, mask_unobserved, to_loss_ratio, validate_observed_shape, Triangle};
use log::debug;

/// Inputs shared read-only by every batch
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationInputs {
    /// Observed cumulative losses, one row per origin period
    pub triangle: Triangle,

    /// Exposure per origin period, strictly positive
    pub exposure: Vec<f64>,

    /// Step weights, `rows x n_dev`; column `j` weights loss-ratio column `j + 1`
    pub weights: Triangle,

    /// Point estimates driving the parameter draws
    pub statistics: DevelopmentStatistics,

    pub tail: TailConfig,

    pub discount: DiscountFactors,

    /// Net-to-gross ratio applied to the discounted reserve
    pub net_to_gross: f64,
}

/// Weight 1 on every observed step and `NaN` elsewhere
pub fn uniform_weights(rows: usize, n_dev: usize) -> Triangle {
    let mut weights = Triangle::filled(rows, n_dev, 1.0);
    for i in 0..rows {
        for j in 0..n_dev {
            if !horizon::is_observed(rows, i, j + 1) {
                weights[(i, j)] = f64::NAN;
            }
        }
    }
    weights
}

/// Observed incremental loss ratios of the steps `1..=n_dev`
///
/// The result has shape `rows x n_dev`, aligned with the weight matrix.
pub fn step_ratios(triangle: &Triangle, exposure: &[f64], n_dev: usize) -> Triangle {
    let mut lr = to_loss_ratio(triangle, exposure).with_width(n_dev + 1);
    mask_unobserved(&mut lr);
    lr.columns_from(1)
}

/// Estimate `dev`, `sigma` and `sd` for an observed triangle
pub fn estimate_statistics(triangle: &Triangle, exposure: &[f64], weights: &Triangle) -> DevelopmentStatistics {
    let ratios = step_ratios(triangle, exposure, weights.cols());
    DevelopmentStatistics::estimate(&ratios, weights, exposure)
}

impl SimulationInputs {
    /// Inputs with uniform weights, estimated statistics, no tail and no
    /// discounting
    pub fn from_triangle(triangle: Triangle, exposure: Vec<f64>) -> Self {
        let n_dev = triangle.cols().saturating_sub(1);
        let weights = uniform_weights(triangle.rows(), n_dev);
        let statistics = estimate_statistics(&triangle, &exposure, &weights);
        Self {
            triangle,
            exposure,
            weights,
            statistics,
            tail: TailConfig::default(),
            discount: DiscountFactors::none(),
            net_to_gross: 1.0,
        }
    }

    /// Replace the weights and re-estimate the statistics
    pub fn with_weights(mut self, weights: Triangle) -> Self {
        self.statistics = estimate_statistics(&self.triangle, &self.exposure, &weights);
        self.weights = weights;
        self
    }

    /// Override the development factors, keeping `sigma` and `sd` estimated
    /// around the selected values
    pub fn with_selected_factors(mut self, dev: Vec<f64>) -> Self {
        let ratios = step_ratios(&self.triangle, &self.exposure, self.weights.cols());
        self.statistics = DevelopmentStatistics::with_factors(&ratios, &self.weights, &self.exposure, dev);
        self
    }

    pub fn with_statistics(mut self, statistics: DevelopmentStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_tail(mut self, tail: TailConfig) -> Self {
        self.tail = tail;
        self
    }

    pub fn with_discount(mut self, discount: DiscountFactors) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_net_to_gross(mut self, net_to_gross: f64) -> Self {
        self.net_to_gross = net_to_gross;
        self
    }

    /// Number of origin periods
    pub fn rows(&self) -> usize {
        self.triangle.rows()
    }

    /// Number of modeled development steps
    pub fn n_dev(&self) -> usize {
        self.statistics.len()
    }

    /// Check shapes and values before any simulation starts
    pub fn validate(&self) -> Result<()> {
        let rows = self.triangle.rows();
        let cols = self.triangle.cols();
        let n_dev = self.n_dev();

        if rows == 0 || n_dev == 0 {
            return Err(ReservingError::InvalidParameter(
                "triangle needs at least one origin period and one development step".into(),
            ));
        }
        // Square, or square plus one helper column
        if cols != rows && cols != rows + 1 {
            return Err(ReservingError::ShapeMismatch {
                what: "triangle",
                expected_rows: rows,
                expected_cols: rows,
                rows,
                cols,
            });
        }
        if n_dev + 1 < cols {
            return Err(ReservingError::LengthMismatch {
                what: "development factors",
                expected: cols - 1,
                found: n_dev,
            });
        }
        for (what, v) in [("sigma", &self.statistics.sigma), ("sd", &self.statistics.sd)] {
            if v.len() != n_dev {
                return Err(ReservingError::LengthMismatch {
                    what,
                    expected: n_dev,
                    found: v.len(),
                });
            }
        }
        if self.exposure.len() != rows {
            return Err(ReservingError::LengthMismatch {
                what: "exposure",
                expected: rows,
                found: self.exposure.len(),
            });
        }
        if self.weights.shape() != (rows, n_dev) {
            return Err(ReservingError::ShapeMismatch {
                what: "weights",
                expected_rows: rows,
                expected_cols: n_dev,
                rows: self.weights.rows(),
                cols: self.weights.cols(),
            });
        }

        validate_observed_shape(&self.triangle)?;

        if let Some((row, &value)) = self
            .exposure
            .iter()
            .enumerate()
            .find(|(_, e)| !(e.is_finite() && **e > 0.0))
        {
            return Err(ReservingError::InvalidExposure { row, value });
        }

        for i in 0..rows {
            for &w in self.weights.row(i) {
                if w.is_infinite() || w < 0.0 {
                    return Err(ReservingError::InvalidParameter(format!(
                        "weight {w} in origin period {i} must be finite and non-negative"
                    )));
                }
            }
        }

        let stats = &self.statistics;
        if let Some(j) = stats.dev.iter().position(|d| !d.is_finite()) {
            return Err(ReservingError::InvalidParameter(format!("dev[{j}] is not finite")));
        }
        for (what, v) in [("sigma", &stats.sigma), ("sd", &stats.sd)] {
            if let Some(j) = v.iter().position(|x| !(x.is_finite() && *x >= 0.0)) {
                return Err(ReservingError::InvalidParameter(format!(
                    "{what}[{j}] must be finite and non-negative"
                )));
            }
        }

        if let Some(&index) = self.tail.inclusion.iter().find(|&&k| k == 0 || k > n_dev) {
            return Err(ReservingError::IndexOutOfRange { index, len: n_dev });
        }
        if self.tail.lower.is_nan() || self.tail.upper.is_nan() || self.tail.lower >= self.tail.upper {
            return Err(ReservingError::InvalidParameter(format!(
                "tail range ({}, {}) is empty",
                self.tail.lower, self.tail.upper
            )));
        }

        if self.discount.factors().iter().any(|f| !f.is_finite()) {
            return Err(ReservingError::InvalidParameter("discount factors must be finite".into()));
        }
        if !self.net_to_gross.is_finite() {
            return Err(ReservingError::InvalidParameter("net_to_gross must be finite".into()));
        }

        debug!("validated inputs: {} origin periods, {} development steps", rows, n_dev);
        Ok(())
    }
}
