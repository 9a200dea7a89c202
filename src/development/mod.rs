//! Development factor estimation on loss-ratio triangles

mod estimator;
mod statistics;

pub use estimator::{weighted_factor, weighted_sigma, weighted_std_error};
pub use statistics::DevelopmentStatistics;
