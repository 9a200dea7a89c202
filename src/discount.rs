//! Discounting of projected claim cashflows
//!
//! Supports:
//! - An explicit vector of factors ordered by settlement lag
//! - Factors generated from a single annual rate
//! - No discounting (empty vector)

use crate::triangle::{horizon, Triangle};
use serde::{Deserialize, Serialize};

/// Multiplicative discount factors by settlement lag
///
/// Lag 0 is the first calendar period after the latest observed diagonal.
/// Lags beyond the vector reuse the last factor; an empty vector means no
/// discounting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountFactors {
    factors: Vec<f64>,
}

impl DiscountFactors {
    /// Use the given factors as is
    pub fn from_factors(factors: Vec<f64>) -> Self {
        Self { factors }
    }

    /// No discounting
    pub fn none() -> Self {
        Self::default()
    }

    /// End-of-period factors `(1 + rate)^-(lag + 1)` for `periods` lags
    pub fn from_annual_rate(annual_rate: f64, periods: usize) -> Self {
        let v = 1.0 / (1.0 + annual_rate);
        Self {
            factors: (1..=periods).map(|t| v.powi(t as i32)).collect(),
        }
    }

    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Discount factor for a settlement lag
    pub fn factor(&self, lag: usize) -> f64 {
        match self.factors.last() {
            None => 1.0,
            Some(&last) => self.factors.get(lag).copied().unwrap_or(last),
        }
    }

    /// Cumulative triangle of discounted incremental cashflows
    ///
    /// Increments on or above the latest diagonal of a triangle with
    /// `origin_rows` origin periods are taken undiscounted; later increments
    /// are discounted by their calendar lag. Missing cells stay `NaN`.
    pub fn discount_cumulative(&self, projected: &Triangle, origin_rows: usize) -> Triangle {
        let mut out = Triangle::new(projected.rows(), projected.cols());

        for i in 0..projected.rows() {
            let mut running = 0.0;
            let mut previous = 0.0;
            for j in 0..projected.cols() {
                let cumulative = projected[(i, j)];
                if cumulative.is_nan() {
                    continue;
                }
                let increment = cumulative - previous;
                previous = cumulative;

                let discount = horizon::calendar_lag(origin_rows, i, j)
                    .map_or(1.0, |lag| self.factor(lag));
                running += increment * discount;
                out[(i, j)] = running;
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_rate_factors() {
        let df = DiscountFactors::from_annual_rate(0.05, 3);

        assert_eq!(df.len(), 3);
        assert_relative_eq!(df.factor(0), 1.0 / 1.05, epsilon = 1e-12);
        assert_relative_eq!(df.factor(2), 1.05_f64.powi(-3), epsilon = 1e-12);
        // Beyond the curve the last factor is held
        assert_eq!(df.factor(10), df.factor(2));
    }

    #[test]
    fn test_empty_means_no_discounting() {
        let df = DiscountFactors::none();
        assert_eq!(df.factor(0), 1.0);
        assert_eq!(df.factor(7), 1.0);

        let projected = Triangle::from_rows(&[vec![10.0, 30.0], vec![5.0, 20.0]]);
        assert_eq!(df.discount_cumulative(&projected, 2), projected);
    }

    #[test]
    fn test_discount_cumulative_only_touches_future_cells() {
        // Two origin periods, one future column for row 1 and one tail column
        let projected = Triangle::from_rows(&[vec![100.0, 150.0, 160.0], vec![80.0, 120.0, 130.0]]);
        let df = DiscountFactors::from_factors(vec![0.5, 0.25]);
        let discounted = df.discount_cumulative(&projected, 2);

        // Row 0: latest column 1, tail increment of 10 at lag 0
        assert_relative_eq!(discounted[(0, 1)], 150.0, epsilon = 1e-12);
        assert_relative_eq!(discounted[(0, 2)], 155.0, epsilon = 1e-12);
        // Row 1: latest column 0, increments 40 at lag 0 and 10 at lag 1
        assert_relative_eq!(discounted[(1, 0)], 80.0, epsilon = 1e-12);
        assert_relative_eq!(discounted[(1, 1)], 100.0, epsilon = 1e-12);
        assert_relative_eq!(discounted[(1, 2)], 102.5, epsilon = 1e-12);
    }
}
