//! Diagonal and calendar-period index bookkeeping for ragged triangles
//!
//! All helpers are pure functions of the number of origin periods. Row `i`
//! has its latest observation in column `rows - 1 - i`.

/// Column of the latest observed cell of `row`
pub fn latest_column(rows: usize, row: usize) -> usize {
    rows.saturating_sub(1 + row)
}

/// Whether `(row, col)` lies on or above the latest diagonal
pub fn is_observed(rows: usize, row: usize, col: usize) -> bool {
    row + col + 1 <= rows
}

/// First row whose step from `col` to `col + 1` has to be simulated
pub fn first_simulated_row(rows: usize, col: usize) -> usize {
    rows.saturating_sub(col).max(1) - 1
}

/// Degrees of freedom of the chi-square draw for development column `col`
pub fn degrees_of_freedom(rows: usize, col: usize) -> usize {
    rows.saturating_sub(col).max(1)
}

/// Settlement lag of a future cell measured from the latest diagonal
///
/// Returns `None` for observed cells. The first future column of a row has
/// lag 0.
pub fn calendar_lag(rows: usize, row: usize, col: usize) -> Option<usize> {
    let offset = latest_column(rows, row);
    if row >= rows || col <= offset {
        None
    } else {
        Some(col - offset - 1)
    }
}

/// Whether `(row, col + 1)` is the first cell beyond the latest diagonal
pub fn is_next_diagonal_step(rows: usize, row: usize, col: usize) -> bool {
    row < rows && row + col + 1 == rows
}
