//! Dense ragged-triangle storage

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Dense row-major `f64` matrix used for claims triangles and weight matrices
///
/// Rows are origin periods, columns are development periods. Unobserved
/// cells hold `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Triangle {
    /// Create a `rows x cols` triangle with every cell unobserved
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, f64::NAN)
    }

    /// Create a `rows x cols` matrix with every cell set to `value`
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Build from ragged rows; the width is the longest row, shorter rows are
    /// padded with `NaN`
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut tri = Self::new(rows.len(), cols);
        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                tri[(i, j)] = value;
            }
        }
        tri
    }

    /// Build from rows where `None` marks an unobserved cell
    pub fn from_nullable_rows(rows: &[Vec<Option<f64>>]) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut tri = Self::new(rows.len(), cols);
        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                tri[(i, j)] = value.unwrap_or(f64::NAN);
            }
        }
        tri
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Cell value, `None` when the index lies outside the matrix
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self[(row, col)] = value;
    }

    /// A cell holds an observation when it is finite
    pub fn is_finite_at(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_some_and(f64::is_finite)
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy of one development column
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self[(i, col)]).collect()
    }

    /// Copy of the last development column (ultimates of a projected triangle)
    pub fn last_column(&self) -> Vec<f64> {
        if self.cols == 0 {
            return Vec::new();
        }
        self.column(self.cols - 1)
    }

    /// Sum of the finite cells of the last column
    pub fn last_column_sum(&self) -> f64 {
        self.last_column().iter().filter(|v| v.is_finite()).sum()
    }

    /// Copy of columns `start..` as a new matrix
    pub fn columns_from(&self, start: usize) -> Triangle {
        let cols = self.cols.saturating_sub(start);
        let mut out = Triangle::new(self.rows, cols);
        for i in 0..self.rows {
            out.row_mut(i).copy_from_slice(&self.row(i)[start..start + cols]);
        }
        out
    }

    /// Copy resized to `cols` columns; new cells are `NaN`
    pub fn with_width(&self, cols: usize) -> Triangle {
        let mut out = Triangle::new(self.rows, cols);
        let keep = cols.min(self.cols);
        for i in 0..self.rows {
            out.row_mut(i)[..keep].copy_from_slice(&self.row(i)[..keep]);
        }
        out
    }

    /// Rows as nested vectors, `NaN` mapped to `None`
    pub fn to_nullable_rows(&self) -> Vec<Vec<Option<f64>>> {
        (0..self.rows)
            .map(|i| {
                self.row(i)
                    .iter()
                    .map(|v| if v.is_nan() { None } else { Some(*v) })
                    .collect()
            })
            .collect()
    }
}

impl Index<(usize, usize)> for Triangle {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(row < self.rows && col < self.cols, "triangle index ({row}, {col}) out of bounds");
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Triangle {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(row < self.rows && col < self.cols, "triangle index ({row}, {col}) out of bounds");
        &mut self.data[row * self.cols + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_pads_ragged() {
        let tri = Triangle::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0], vec![6.0]]);

        assert_eq!(tri.shape(), (3, 3));
        assert_eq!(tri[(1, 1)], 5.0);
        assert!(tri[(1, 2)].is_nan());
        assert!(tri[(2, 1)].is_nan());
        assert!(tri.get(3, 0).is_none());
    }

    #[test]
    fn test_nullable_round_trip() {
        let rows = vec![vec![Some(1.0), Some(2.0)], vec![Some(3.0), None]];
        let tri = Triangle::from_nullable_rows(&rows);

        assert!(!tri.is_finite_at(1, 1));
        assert_eq!(tri.to_nullable_rows(), rows);
    }

    #[test]
    fn test_columns_from_and_width() {
        let tri = Triangle::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0]]);

        let tail = tri.columns_from(1);
        assert_eq!(tail.shape(), (2, 2));
        assert_eq!(tail[(0, 1)], 3.0);

        let wide = tri.with_width(5);
        assert_eq!(wide.shape(), (2, 5));
        assert_eq!(wide[(1, 1)], 5.0);
        assert!(wide[(0, 4)].is_nan());
    }

    #[test]
    fn test_last_column_sum_skips_nan() {
        let tri = Triangle::from_rows(&[vec![1.0, 10.0], vec![2.0]]);
        assert_eq!(tri.last_column_sum(), 10.0);
    }
}
