//! Monte Carlo simulation of the lower triangle
//!
//! Each path samples development factors (parameter uncertainty), residual
//! variances and lognormal process noise, refits the tail on its own
//! projected diagonal and reduces to gross, discounted gross and discounted
//! net ultimates.

mod batch;
mod config;
mod inputs;
mod path;
mod result;

pub use batch::{stream_seed, BatchDraws, BatchDriver};
pub use config::{CancellationToken, SimulationConfig, DEFAULT_MAIN_SEED};
pub use inputs::{estimate_statistics, step_ratios, uniform_weights, SimulationInputs};
pub use path::{residual_weight, sample_step_ratio, PathDraws, PathSimulator};
pub use result::{
    percentile_sorted, ColumnSummary, Percentile, ResultSummary, SimulationResult, UltimateEstimate,
    SUMMARY_PERCENTILES,
};
