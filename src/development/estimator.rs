//! Weighted loss-ratio development factors, residual variances and standard
//! errors
//!
//! Each function works column by column on a loss-ratio triangle and only
//! uses rows where the loss ratio, the weight and the exposure are all
//! finite. Sparse columns resolve to documented fallback values rather than
//! errors.

use crate::triangle::Triangle;
use log::debug;

fn usable(lr: f64, w: f64, e: f64) -> bool {
    lr.is_finite() && w.is_finite() && e.is_finite()
}

fn exposure_at(exposure: &[f64], row: usize) -> f64 {
    exposure.get(row).copied().unwrap_or(f64::NAN)
}

/// Weighted mean loss ratio per column: `Σ lr·w·e / Σ w·e`
///
/// A zero denominator yields `0.0`, which callers read as "no data" rather
/// than as a genuine zero factor.
pub fn weighted_factor(lr: &Triangle, weights: &Triangle, exposure: &[f64]) -> Vec<f64> {
    (0..lr.cols())
        .map(|j| {
            let mut numerator = 0.0;
            let mut denominator = 0.0;
            for i in 0..lr.rows() {
                let value = lr[(i, j)];
                let w = weights.get(i, j).unwrap_or(f64::NAN);
                let e = exposure_at(exposure, i);
                if usable(value, w, e) {
                    numerator += value * w * e;
                    denominator += w * e;
                }
            }
            if denominator == 0.0 {
                debug!("development column {}: zero weighted exposure, factor set to 0", j);
                0.0
            } else {
                numerator / denominator
            }
        })
        .collect()
}

/// Weighted residual variance per column: `Σ w·e·(lr - dev)² / (Σw - 1)`
///
/// Columns with `Σw <= 1` or a zero numerator carry the previous column's
/// value forward. The first column has no left neighbour and falls back to
/// `0.0`.
pub fn weighted_sigma(lr: &Triangle, weights: &Triangle, exposure: &[f64], dev: &[f64]) -> Vec<f64> {
    let mut sigma: Vec<f64> = Vec::with_capacity(lr.cols());

    for j in 0..lr.cols() {
        let mean = dev.get(j).copied().unwrap_or(0.0);
        let mut numerator = 0.0;
        let mut weight_sum = 0.0;
        for i in 0..lr.rows() {
            let value = lr[(i, j)];
            let w = weights.get(i, j).unwrap_or(f64::NAN);
            let e = exposure_at(exposure, i);
            if usable(value, w, e) {
                numerator += w * e * (value - mean).powi(2);
                weight_sum += w;
            }
        }

        let value = if weight_sum > 1.0 && numerator != 0.0 {
            numerator / (weight_sum - 1.0)
        } else {
            let carried = sigma.last().copied().unwrap_or(0.0);
            debug!(
                "development column {}: sigma fallback (weight sum {}), carrying {}",
                j, weight_sum, carried
            );
            carried
        };
        sigma.push(value);
    }

    sigma
}

/// Standard error of each factor estimate: `sqrt(sigma / Σ w·e)`
///
/// `weights` must already be masked to the observed cells (see
/// [`crate::triangle::mask_weights`]). A zero weighted exposure carries the
/// previous column's value forward (`0.0` for the first column).
pub fn weighted_std_error(sigma: &[f64], weights: &Triangle, exposure: &[f64]) -> Vec<f64> {
    let mut sd: Vec<f64> = Vec::with_capacity(sigma.len());

    for (j, &s) in sigma.iter().enumerate() {
        let mut weighted_exposure = 0.0;
        for i in 0..weights.rows() {
            let w = weights.get(i, j).unwrap_or(f64::NAN);
            let e = exposure_at(exposure, i);
            if w.is_finite() && e.is_finite() {
                weighted_exposure += w * e;
            }
        }

        let value = if weighted_exposure == 0.0 {
            let carried = sd.last().copied().unwrap_or(0.0);
            debug!("development column {}: zero weighted exposure, sd carries {}", j, carried);
            carried
        } else {
            (s / weighted_exposure).sqrt()
        };
        sd.push(value);
    }

    sd
}
