//! Tail extrapolation beyond the modeled development periods
//!
//! Factors eligible for the fit are picked by a caller-supplied 1-based
//! inclusion list and an open value range, regressed log-linearly on their
//! development index, and extrapolated as `exp(a·k + b)`.
//!
//! The `curves` families are fitted to the age-to-age factors of the same
//! inclusion set and reported alongside, ranked by R².

mod curves;
mod fit;

pub use curves::{
    age_to_age_factors, best_curve, fit_curve, fit_curves, r_squared, CurveFamily, CurveFit,
    INVERSE_POWER_OFFSETS,
};
pub use fit::{fit_log_linear, project_tail_factors, select_in_range, LogLinearFit};

use crate::development::DevelopmentStatistics;
use crate::triangle::Triangle;
use serde::{Deserialize, Serialize};

/// Tail fitting controls shared by the point estimate and every simulated path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailConfig {
    /// 1-based development indices eligible for the regression
    pub inclusion: Vec<usize>,

    /// Exclusive lower bound on eligible factor values
    pub lower: f64,

    /// Exclusive upper bound on eligible factor values
    pub upper: f64,

    /// Number of development periods to extrapolate beyond the modeled ones
    pub tail_length: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            inclusion: Vec::new(),
            lower: 0.0,
            upper: f64::INFINITY,
            tail_length: 0,
        }
    }
}

impl TailConfig {
    /// Tail over `tail_length` periods fitted on every modeled index
    pub fn all_indices(n_dev: usize, tail_length: usize) -> Self {
        Self {
            inclusion: (1..=n_dev).collect(),
            tail_length,
            ..Default::default()
        }
    }

    /// Fit the eligible factors of `stats`
    pub fn fit(&self, stats: &DevelopmentStatistics) -> LogLinearFit {
        let (values, indices) = select_in_range(&stats.dev, &self.inclusion, self.lower, self.upper);
        let sd: Vec<f64> = indices
            .iter()
            .map(|&k| stats.sd.get(k).copied().unwrap_or(0.0))
            .collect();
        fit_log_linear(&values, &sd, &indices)
    }

    /// Fit and extrapolate `tail_length` factors for the indices following
    /// the modeled ones
    pub fn fit_and_project(&self, stats: &DevelopmentStatistics) -> (LogLinearFit, Vec<f64>) {
        if self.tail_length == 0 {
            return (LogLinearFit::default(), Vec::new());
        }
        let fit = self.fit(stats);
        let start = stats.len();
        let factors = project_tail_factors(fit.a, fit.b, start, start + self.tail_length - 1);
        (fit, factors)
    }

    /// Fit every curve family to the included age-to-age factors of the
    /// observed cumulative `triangle`
    ///
    /// An empty inclusion list uses every step. The value range is not
    /// applied; it bounds incremental loss ratios, not link ratios.
    pub fn compare_curves(&self, triangle: &Triangle) -> Vec<CurveFit> {
        let factors = age_to_age_factors(triangle);
        let periods: Vec<usize> = if self.inclusion.is_empty() {
            (1..=factors.len()).collect()
        } else {
            self.inclusion.clone()
        };
        let (values, indices): (Vec<f64>, Vec<usize>) = periods
            .iter()
            .filter_map(|&t| Some((*factors.get(t.checked_sub(1)?)?, t)))
            .unzip();
        fit_curves(&values, &indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn decaying_stats() -> DevelopmentStatistics {
        let dev: Vec<f64> = (0..6).map(|k| (-0.5 * k as f64 + 1.0).exp()).collect();
        let sd = dev.iter().map(|d| d * 0.3).collect();
        DevelopmentStatistics {
            sigma: vec![0.0; dev.len()],
            dev,
            sd,
        }
    }

    #[test]
    fn test_fit_and_project_continues_indices() {
        let stats = decaying_stats();
        let config = TailConfig::all_indices(6, 3);
        let (fit, tail) = config.fit_and_project(&stats);

        assert_relative_eq!(fit.a, -0.5, epsilon = 1e-10);
        assert_eq!(tail.len(), 3);
        assert_relative_eq!(tail[0], (-0.5_f64 * 6.0 + 1.0).exp(), epsilon = 1e-10);
        assert_relative_eq!(tail[2], (-0.5_f64 * 8.0 + 1.0).exp(), epsilon = 1e-10);
    }

    #[test]
    fn test_range_excludes_factors() {
        let mut stats = decaying_stats();
        // A zero factor would otherwise pull the fit towards y = 0
        stats.dev[5] = 0.0;
        let config = TailConfig::all_indices(6, 1);
        let (fit, _) = config.fit_and_project(&stats);

        assert_relative_eq!(fit.a, -0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_compare_curves_on_inclusion() {
        // Link ratios 1 + 0.5·exp(-0.6·t) at ages 1..=6
        let mut rows = Vec::new();
        for i in 0..7 {
            let mut row = vec![100.0];
            for t in 1..7 - i {
                let last = row[row.len() - 1];
                row.push(last * (1.0 + 0.5 * (-0.6 * t as f64).exp()));
            }
            rows.push(row);
        }
        let triangle = Triangle::from_rows(&rows);

        let fits = TailConfig::default().compare_curves(&triangle);
        let best = best_curve(&fits).unwrap();
        assert_eq!(best.family, CurveFamily::Exponential);
        assert_relative_eq!(best.slope, -0.6, epsilon = 1e-9);

        // Ages outside the triangle are ignored
        let config = TailConfig {
            inclusion: vec![2, 3, 4, 40],
            ..Default::default()
        };
        let fits = config.compare_curves(&triangle);
        assert_eq!(fits.len(), 4);
        assert_relative_eq!(fits[0].predict(5.0), 1.0 + 0.5 * (-3.0_f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_no_tail_requested() {
        let (fit, tail) = TailConfig::default().fit_and_project(&decaying_stats());
        assert!(tail.is_empty());
        assert!(fit.is_degenerate());
    }
}
