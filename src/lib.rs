//! Stochastic Reserving - Monte Carlo engine for claims-reserve variability
//!
//! This library provides:
//! - Loss-ratio triangle algebra (base triangle, loss ratios, diagonals)
//! - Weighted development factors, residual variances and standard errors
//! - Log-linear tail fitting and extrapolation, with curve families ranked by R²
//! - Seeded, batched, parallel simulation of the lower triangle
//! - Gross, discounted gross and discounted net ultimates per path

pub mod triangle;
pub mod development;
pub mod tail;
pub mod discount;
pub mod simulation;
pub mod engine;
pub mod request;
pub mod demo;
pub mod error;

// Re-export commonly used types
pub use triangle::Triangle;
pub use development::DevelopmentStatistics;
pub use tail::{TailConfig, LogLinearFit};
pub use discount::DiscountFactors;
pub use simulation::{
    CancellationToken, SimulationConfig, SimulationInputs, SimulationResult, UltimateEstimate,
};
pub use engine::ReservingEngine;
pub use request::{SimulationRequest, SimulationResponse};
pub use error::{ReservingError, Result};
