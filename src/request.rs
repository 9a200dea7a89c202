//! JSON request and response bodies for a simulation run

use crate::development::DevelopmentStatistics;
use crate::discount::DiscountFactors;
use crate::engine::ReservingEngine;
use crate::error::{ReservingError, Result};
use crate::simulation::{
    estimate_statistics, step_ratios, uniform_weights, ResultSummary, SimulationConfig, SimulationInputs,
    SimulationResult, UltimateEstimate, DEFAULT_MAIN_SEED,
};
use crate::tail::{CurveFit, TailConfig};
use crate::triangle::{zero_to_nan, Triangle};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Input configuration for a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Cumulative losses by origin period; `null` marks a missing cell
    pub triangle: Vec<Vec<Option<f64>>>,

    /// Exposure per origin period (default: 1 for every row)
    #[serde(default)]
    pub exposure: Option<Vec<f64>>,

    /// Step weights, `rows x n_dev` (default: 1 on every observed step)
    #[serde(default)]
    pub weights: Option<Vec<Vec<Option<f64>>>>,

    /// User-selected development factors replacing the estimated ones
    #[serde(default)]
    pub selected_factors: Option<Vec<f64>>,

    /// 1-based development indices used by the tail fit
    #[serde(default)]
    pub tail_inclusion: Vec<usize>,

    /// Number of tail periods to extrapolate (default: 0, no tail)
    #[serde(default)]
    pub tail_length: usize,

    /// Exclusive lower bound of factors eligible for the tail fit
    #[serde(default)]
    pub tail_lower: f64,

    /// Exclusive upper bound of factors eligible for the tail fit (default: none)
    #[serde(default)]
    pub tail_upper: Option<f64>,

    /// Discount factors by settlement lag (default: no discounting)
    #[serde(default)]
    pub discount_factors: Vec<f64>,

    /// Flat annual discount rate, used when no explicit factors are given
    #[serde(default)]
    pub discount_rate: Option<f64>,

    #[serde(default = "default_one")]
    pub net_to_gross: f64,

    #[serde(default = "default_sim_total")]
    pub sim_total: usize,

    #[serde(default = "default_batch_sim")]
    pub batch_sim: usize,

    #[serde(default = "default_main_seed")]
    pub main_seed: u64,

    /// Treat literal zeros outside the first origin period as unobserved
    #[serde(default = "default_true")]
    pub zero_as_missing: bool,
}

fn default_one() -> f64 { 1.0 }
fn default_sim_total() -> usize { 1000 }
fn default_batch_sim() -> usize { 1000 }
fn default_main_seed() -> u64 { DEFAULT_MAIN_SEED }
fn default_true() -> bool { true }

impl SimulationRequest {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Simulation controls carried by the request
    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            sim_total: self.sim_total,
            batch_sim: self.batch_sim,
            main_seed: self.main_seed,
            ..Default::default()
        }
    }

    /// Build simulation inputs; the result still needs validating
    pub fn to_inputs(&self) -> Result<SimulationInputs> {
        let mut triangle = Triangle::from_nullable_rows(&self.triangle);
        if self.zero_as_missing {
            zero_to_nan(&mut triangle);
        }
        let rows = triangle.rows();
        let n_dev = triangle.cols().saturating_sub(1);

        let exposure = self.exposure.clone().unwrap_or_else(|| vec![1.0; rows]);

        let weights = match &self.weights {
            Some(w) => {
                let weights = Triangle::from_nullable_rows(w);
                if weights.cols() < n_dev {
                    weights.with_width(n_dev)
                } else {
                    weights
                }
            }
            None => uniform_weights(rows, n_dev),
        };

        let statistics = match &self.selected_factors {
            Some(dev) => {
                if dev.len() != weights.cols() {
                    return Err(ReservingError::LengthMismatch {
                        what: "selected factors",
                        expected: weights.cols(),
                        found: dev.len(),
                    });
                }
                let ratios = step_ratios(&triangle, &exposure, weights.cols());
                DevelopmentStatistics::with_factors(&ratios, &weights, &exposure, dev.clone())
            }
            None => estimate_statistics(&triangle, &exposure, &weights),
        };

        let discount = match (self.discount_factors.is_empty(), self.discount_rate) {
            (true, Some(rate)) => DiscountFactors::from_annual_rate(rate, n_dev + self.tail_length),
            _ => DiscountFactors::from_factors(self.discount_factors.clone()),
        };

        Ok(SimulationInputs {
            triangle,
            exposure,
            weights,
            statistics,
            tail: TailConfig {
                inclusion: self.tail_inclusion.clone(),
                lower: self.tail_lower,
                upper: self.tail_upper.unwrap_or(f64::INFINITY),
                tail_length: self.tail_length,
            },
            discount,
            net_to_gross: self.net_to_gross,
        })
    }
}

/// Output of a simulation run
#[derive(Debug, Serialize)]
pub struct SimulationResponse {
    pub sim_total: usize,
    pub batch_sim: usize,
    pub main_seed: u64,
    pub latest_diagonal: f64,
    pub point_estimate: UltimateEstimate,
    /// Cumulative triangle projected with the point factors and tail
    pub projected_triangle: Vec<Vec<Option<f64>>>,
    pub statistics: DevelopmentStatistics,
    /// Curve families fitted to the observed age-to-age factors
    pub tail_curves: Vec<CurveFit>,
    pub summary: ResultSummary,
    /// `[gross, gross_discounted, net_discounted]` per path
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<[f64; 3]>,
    pub execution_time_ms: u64,
}

impl SimulationResponse {
    /// `include_paths` controls whether the full matrix is serialized
    pub fn new(
        config: &SimulationConfig,
        engine: &ReservingEngine,
        result: &SimulationResult,
        include_paths: bool,
        execution_time_ms: u64,
    ) -> Result<Self> {
        Ok(Self {
            sim_total: config.sim_total,
            batch_sim: config.batch_sim,
            main_seed: config.main_seed,
            latest_diagonal: engine.latest_diagonal(),
            point_estimate: engine.point_estimate()?,
            projected_triangle: engine.point_triangle()?.to_nullable_rows(),
            statistics: engine.inputs().statistics.clone(),
            tail_curves: engine.tail_curves(),
            summary: result.summary(),
            results: if include_paths { result.matrix() } else { Vec::new() },
            execution_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SMALL_REQUEST: &str = r#"{
        "triangle": [[100, 150, 170], [110, 160, null], [120, null, null]],
        "sim_total": 50,
        "batch_sim": 25
    }"#;

    #[test]
    fn test_defaults() {
        let request = SimulationRequest::from_json_str(SMALL_REQUEST).unwrap();
        assert_eq!(request.main_seed, DEFAULT_MAIN_SEED);
        assert_eq!(request.net_to_gross, 1.0);
        assert!(request.zero_as_missing);
        assert_eq!(request.tail_length, 0);

        let config = request.simulation_config();
        assert_eq!(config.sim_total, 50);
        assert_eq!(config.batch_count(), 2);
    }

    #[test]
    fn test_to_inputs_estimates_statistics() {
        let inputs = SimulationRequest::from_json_str(SMALL_REQUEST).unwrap().to_inputs().unwrap();
        assert!(inputs.validate().is_ok());
        assert_eq!(inputs.exposure, vec![1.0; 3]);
        assert_relative_eq!(inputs.statistics.dev[0], 50.0, epsilon = 1e-12);
        assert!(inputs.discount.is_empty());
        assert!(inputs.tail.upper.is_infinite());
    }

    #[test]
    fn test_zero_as_missing() {
        let json = r#"{"triangle": [[100, 150, 170], [110, 160, 0], [120, 0, 0]]}"#;
        let inputs = SimulationRequest::from_json_str(json).unwrap().to_inputs().unwrap();
        assert!(inputs.triangle[(1, 2)].is_nan());
        assert!(inputs.validate().is_ok());

        let json = r#"{"triangle": [[100, 150, 170], [110, 160, 0], [120, 0, 0]], "zero_as_missing": false}"#;
        let inputs = SimulationRequest::from_json_str(json).unwrap().to_inputs().unwrap();
        assert_eq!(inputs.triangle[(1, 2)], 0.0);
    }

    #[test]
    fn test_selected_factors_length_checked() {
        let json = r#"{"triangle": [[100, 150, 170], [110, 160], [120]], "selected_factors": [1.0]}"#;
        let request = SimulationRequest::from_json_str(json).unwrap();
        assert!(matches!(
            request.to_inputs(),
            Err(ReservingError::LengthMismatch { what: "selected factors", .. })
        ));
    }

    #[test]
    fn test_discount_rate_generates_factors() {
        let json = r#"{"triangle": [[100, 150, 170], [110, 160], [120]], "discount_rate": 0.05, "tail_length": 2}"#;
        let inputs = SimulationRequest::from_json_str(json).unwrap().to_inputs().unwrap();
        assert_eq!(inputs.discount.len(), 4);
        assert_relative_eq!(inputs.discount.factor(0), 1.0 / 1.05, epsilon = 1e-12);
    }

    #[test]
    fn test_response_carries_projection() {
        let request = SimulationRequest::from_json_str(SMALL_REQUEST).unwrap();
        let engine = ReservingEngine::from_request(&request).unwrap();
        let config = request.simulation_config();
        let result = engine.simulate(&config).unwrap();

        let response = SimulationResponse::new(&config, &engine, &result, false, 0).unwrap();
        assert!(response.results.is_empty());
        assert_relative_eq!(response.latest_diagonal, 450.0);
        // dev = [50, 20]: the lower triangle is filled in
        assert_eq!(response.projected_triangle[2], vec![Some(120.0), Some(170.0), Some(190.0)]);
        // Two link ratios: every family passes through both
        assert_eq!(response.tail_curves.len(), 4);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("results").is_none());
        assert_eq!(json["projected_triangle"][1][2], 180.0);

        let with_paths = SimulationResponse::new(&config, &engine, &result, true, 0).unwrap();
        assert_eq!(with_paths.results.len(), 50);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            SimulationRequest::from_json_str("{"),
            Err(ReservingError::Json(_))
        ));
    }
}
