//! Triangle algebra: base-triangle construction, loss ratios, diagonal sums
//! and masking

use super::horizon;
use super::matrix::Triangle;
use crate::error::{ReservingError, Result};

/// Widen `triangle` to `n_dev + 1` columns for projection
///
/// Cells beyond the input width are `NaN` placeholders. Narrower targets
/// truncate. Never fails; callers check the resulting shape.
pub fn build_base_triangle(triangle: &Triangle, n_dev: usize) -> Triangle {
    triangle.with_width(n_dev + 1)
}

/// Convert a cumulative triangle to incremental loss ratios
///
/// Column 0 is `cum[0] / exposure`; later columns are
/// `(cum[j] - cum[j-1]) / exposure`. A missing source cell stays `NaN`.
/// Only the first `rows + 1` columns are used, so callers may pass a
/// triangle carrying one extra helper column.
pub fn to_loss_ratio(triangle: &Triangle, exposure: &[f64]) -> Triangle {
    let rows = triangle.rows();
    let cols = triangle.cols().min(rows + 1);
    let mut out = Triangle::new(rows, cols);

    for i in 0..rows {
        let e = exposure.get(i).copied().unwrap_or(f64::NAN);
        for j in 0..cols {
            let current = triangle[(i, j)];
            if current.is_nan() {
                continue;
            }
            out[(i, j)] = if j == 0 {
                current / e
            } else {
                (current - triangle[(i, j - 1)]) / e
            };
        }
    }

    out
}

/// Sum of cell `(i, cols - 1 - i)` over all rows: the latest diagonal
///
/// Rows without such a column and missing cells are skipped.
pub fn sum_reverse_diagonal(triangle: &Triangle) -> f64 {
    let cols = triangle.cols();
    (0..triangle.rows())
        .filter(|&i| i < cols)
        .map(|i| triangle[(i, cols - 1 - i)])
        .filter(|v| v.is_finite())
        .sum()
}

/// Apply the "zero means unobserved" rule
///
/// Outside the first origin period a literal `0.0` encodes a cell that has
/// not been observed yet and is replaced with `NaN`. Row 0 is left alone.
pub fn zero_to_nan(triangle: &mut Triangle) {
    for i in 1..triangle.rows() {
        for value in triangle.row_mut(i) {
            if *value == 0.0 {
                *value = f64::NAN;
            }
        }
    }
}

/// Blank every cell below the latest diagonal
pub fn mask_unobserved(triangle: &mut Triangle) {
    let rows = triangle.rows();
    for i in 0..rows {
        for (j, value) in triangle.row_mut(i).iter_mut().enumerate() {
            if !horizon::is_observed(rows, i, j) {
                *value = f64::NAN;
            }
        }
    }
}

/// Copy of `weights` with `NaN` wherever the weighted value is not finite
pub fn mask_weights(weights: &Triangle, values: &Triangle) -> Triangle {
    let mut out = weights.clone();
    for i in 0..out.rows() {
        for j in 0..out.cols() {
            if !values.is_finite_at(i, j) {
                out[(i, j)] = f64::NAN;
            }
        }
    }
    out
}

/// Check that every cell of the observed region holds a finite value
pub fn validate_observed_shape(triangle: &Triangle) -> Result<()> {
    let rows = triangle.rows();
    for i in 0..rows {
        let last = horizon::latest_column(rows, i).min(triangle.cols().saturating_sub(1));
        for j in 0..=last {
            if !triangle.is_finite_at(i, j) {
                return Err(ReservingError::MissingObservation { row: i, col: j });
            }
        }
    }
    Ok(())
}
