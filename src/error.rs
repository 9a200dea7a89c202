//! Error type shared by the reserving engine

use thiserror::Error;

/// Errors raised by input validation and by the simulation driver
///
/// Numerically degenerate estimates (zero denominators, singular tail fits)
/// are not errors: they resolve to documented fallback values and are logged.
#[derive(Debug, Error)]
pub enum ReservingError {
    /// A matrix does not have the dimensions required by its companion inputs
    #[error("{what}: expected {expected_rows}x{expected_cols}, found {rows}x{cols}")]
    ShapeMismatch {
        what: &'static str,
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    /// A vector does not have the required length
    #[error("{what}: expected length {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// A cell inside the observed region of the triangle is missing
    #[error("triangle cell ({row}, {col}) lies in the observed region but is missing")]
    MissingObservation { row: usize, col: usize },

    /// Exposure must be finite and strictly positive
    #[error("exposure for origin period {row} must be finite and positive, got {value}")]
    InvalidExposure { row: usize, value: f64 },

    /// Any other invalid scalar or vector entry
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A 1-based development index outside the modeled range
    #[error("development index {index} is outside 1..={len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A random distribution could not be constructed
    #[error("distribution error: {0}")]
    Distribution(String),

    /// A simulated path produced NaN or infinite ultimates
    #[error("simulation produced non-finite ultimate at row {row}")]
    NonFiniteUltimate { row: usize },

    /// The run was cancelled before the given batch started
    #[error("simulation cancelled before batch {batch}")]
    Cancelled { batch: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ReservingError>;
