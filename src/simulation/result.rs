//! Simulated ultimates and their summary statistics

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Ultimates of one projection: one row of the result matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UltimateEstimate {
    /// Gross ultimate, undiscounted, tail included
    pub gross: f64,

    /// Gross ultimate with future cashflows discounted
    pub gross_discounted: f64,

    /// `latest + (gross_discounted - latest) * net_to_gross`
    pub net_discounted: f64,
}

impl UltimateEstimate {
    pub fn is_finite(&self) -> bool {
        self.gross.is_finite() && self.gross_discounted.is_finite() && self.net_discounted.is_finite()
    }

    /// Columns in result-matrix order
    pub fn as_array(&self) -> [f64; 3] {
        [self.gross, self.gross_discounted, self.net_discounted]
    }
}

/// Percentile levels reported by [`ColumnSummary`]
pub const SUMMARY_PERCENTILES: [f64; 5] = [50.0, 75.0, 90.0, 95.0, 99.5];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentile {
    pub level: f64,
    pub value: f64,
}

/// Distribution summary of one result column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for a single path
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: Vec<Percentile>,
}

impl ColumnSummary {
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                mean: f64::NAN,
                std_dev: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                percentiles: Vec::new(),
            };
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let std_dev = if n > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Self {
            mean,
            std_dev,
            min: sorted[0],
            max: sorted[n - 1],
            percentiles: SUMMARY_PERCENTILES
                .iter()
                .map(|&level| Percentile {
                    level,
                    value: percentile_sorted(&sorted, level),
                })
                .collect(),
        }
    }

    /// Value at a reported percentile level, if present
    pub fn percentile(&self, level: f64) -> Option<f64> {
        self.percentiles.iter().find(|p| p.level == level).map(|p| p.value)
    }
}

/// Linearly interpolated percentile of sorted data, `level` in `[0, 100]`
pub fn percentile_sorted(sorted: &[f64], level: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let position = (level / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Summaries of all three result columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub gross: ColumnSummary,
    pub gross_discounted: ColumnSummary,
    pub net_discounted: ColumnSummary,
}

/// `sim_total x 3` matrix of simulated ultimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub rows: Vec<UltimateEstimate>,
}

impl SimulationResult {
    pub fn new(rows: Vec<UltimateEstimate>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn gross(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.gross).collect()
    }

    pub fn gross_discounted(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.gross_discounted).collect()
    }

    pub fn net_discounted(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.net_discounted).collect()
    }

    /// Plain `[gross, gross_discounted, net_discounted]` rows
    pub fn matrix(&self) -> Vec<[f64; 3]> {
        self.rows.iter().map(UltimateEstimate::as_array).collect()
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            gross: ColumnSummary::from_values(&self.gross()),
            gross_discounted: ColumnSummary::from_values(&self.gross_discounted()),
            net_discounted: ColumnSummary::from_values(&self.net_discounted()),
        }
    }

    /// Write one CSV line per path with a `path` index column
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["path", "gross", "gross_discounted", "net_discounted"])?;
        for (path, row) in self.rows.iter().enumerate() {
            wtr.write_record([
                path.to_string(),
                row.gross.to_string(),
                row.gross_discounted.to_string(),
                row.net_discounted.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}
