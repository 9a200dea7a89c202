//! Weighted log-linear regression of development factors on their index

use log::debug;
use serde::{Deserialize, Serialize};

/// Fitted `ln(dev) = a·k + b`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LogLinearFit {
    /// Slope per development period
    pub a: f64,
    /// Intercept
    pub b: f64,
}

impl LogLinearFit {
    /// The zero fit returned when the normal equations are singular
    pub fn is_degenerate(&self) -> bool {
        self.a == 0.0 && self.b == 0.0
    }

    /// `exp(a·k + b)`
    pub fn factor(&self, k: usize) -> f64 {
        (self.a * k as f64 + self.b).exp()
    }
}

/// Keep the 1-based `indices` whose value lies strictly inside `(lo, hi)`
///
/// Returns the selected values and their zero-based indices, in the order
/// given. Indices outside `values` are skipped.
pub fn select_in_range(values: &[f64], indices: &[usize], lo: f64, hi: f64) -> (Vec<f64>, Vec<usize>) {
    indices
        .iter()
        .filter_map(|&index| {
            let zero_based = index.checked_sub(1)?;
            let value = *values.get(zero_based)?;
            (value > lo && value < hi).then_some((value, zero_based))
        })
        .unzip()
}

/// Precision weight of one point: `1 / sqrt(ln(1 + sd²/dev²))`
///
/// The weight is 0 when the log argument is exactly 0 or the result is not
/// finite.
fn precision_weight(dev: f64, sd: f64) -> f64 {
    let log_arg = (1.0 + (sd * sd) / (dev * dev)).ln();
    if log_arg == 0.0 {
        return 0.0;
    }
    let weight = 1.0 / log_arg.sqrt();
    if weight.is_finite() {
        weight
    } else {
        0.0
    }
}

/// Weighted least-squares line through `(x, y)`: `(slope, intercept)`
///
/// `None` when the normal equations are singular.
pub(crate) fn weighted_line(points: impl IntoIterator<Item = (f64, f64, f64)>) -> Option<(f64, f64)> {
    let mut s = 0.0;
    let mut sx = 0.0;
    let mut sxx = 0.0;
    let mut sy = 0.0;
    let mut sxy = 0.0;

    for (x, y, w) in points {
        s += w;
        sx += w * x;
        sxx += w * x * x;
        sy += w * y;
        sxy += w * x * y;
    }

    let det = s * sxx - sx * sx;
    if det == 0.0 {
        return None;
    }
    Some(((s * sxy - sx * sy) / det, (sxx * sy - sx * sxy) / det))
}

/// Weighted least squares of `ln(dev)` on `x`
///
/// Non-positive factors contribute `y = 0` instead of being dropped. A zero
/// determinant gives the degenerate `(0, 0)` fit.
pub fn fit_log_linear(dev: &[f64], sd: &[f64], x: &[usize]) -> LogLinearFit {
    let points = dev.iter().zip(sd).zip(x).map(|((&d, &s_d), &k)| {
        let y = if d > 0.0 { d.ln() } else { 0.0 };
        (k as f64, y, precision_weight(d, s_d))
    });

    match weighted_line(points) {
        Some((a, b)) => LogLinearFit { a, b },
        None => {
            debug!("log-linear tail fit over {} points is degenerate", x.len());
            LogLinearFit::default()
        }
    }
}

/// `exp(a·k + b)` for every `k` in `[k_start, k_stop]`
pub fn project_tail_factors(a: f64, b: f64, k_start: usize, k_stop: usize) -> Vec<f64> {
    if k_stop < k_start {
        return Vec::new();
    }
    let fit = LogLinearFit { a, b };
    (k_start..=k_stop).map(|k| fit.factor(k)).collect()
}
