//! Reserving engine: validated inputs plus point and stochastic runs
//!
//! Validates inputs once, then allows running many simulations with
//! different configurations without rebuilding them.

use crate::error::Result;
use crate::request::SimulationRequest;
use crate::simulation::{
    BatchDriver, CancellationToken, PathSimulator, SimulationConfig, SimulationInputs, SimulationResult,
    UltimateEstimate,
};
use crate::tail::CurveFit;
use crate::triangle::Triangle;

/// Pre-validated engine for repeated simulations
///
/// # Example
/// ```ignore
/// let engine = ReservingEngine::new(demo::raa_inputs())?;
///
/// for seed in [1, 2, 3] {
///     let result = engine.simulate(&SimulationConfig::default().with_seed(seed))?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ReservingEngine {
    inputs: SimulationInputs,
}

impl ReservingEngine {
    /// Validate and wrap the inputs
    pub fn new(inputs: SimulationInputs) -> Result<Self> {
        inputs.validate()?;
        Ok(Self { inputs })
    }

    /// Build the engine from a JSON request
    pub fn from_request(request: &SimulationRequest) -> Result<Self> {
        Self::new(request.to_inputs()?)
    }

    pub fn inputs(&self) -> &SimulationInputs {
        &self.inputs
    }

    /// Sum of the latest observed diagonal
    pub fn latest_diagonal(&self) -> f64 {
        PathSimulator::new(&self.inputs).latest()
    }

    /// Deterministic ultimates with point factors and point tail
    pub fn point_estimate(&self) -> Result<UltimateEstimate> {
        PathSimulator::new(&self.inputs).point_estimate()
    }

    /// Projected cumulative triangle behind [`Self::point_estimate`]
    pub fn point_triangle(&self) -> Result<Triangle> {
        PathSimulator::new(&self.inputs).point_triangle()
    }

    /// Curve families fitted to the observed age-to-age factors
    pub fn tail_curves(&self) -> Vec<CurveFit> {
        self.inputs.tail.compare_curves(&self.inputs.triangle)
    }

    /// Run one simulation
    pub fn simulate(&self, config: &SimulationConfig) -> Result<SimulationResult> {
        BatchDriver::new(&self.inputs, config.clone())?.run(None)
    }

    /// Run one simulation, stopping before the next batch once `token` is
    /// cancelled
    pub fn simulate_with_cancellation(
        &self,
        config: &SimulationConfig,
        token: &CancellationToken,
    ) -> Result<SimulationResult> {
        BatchDriver::new(&self.inputs, config.clone())?.run(Some(token))
    }

    /// Run multiple simulations (different configs) on the same inputs
    pub fn run_scenarios(&self, configs: &[SimulationConfig]) -> Result<Vec<SimulationResult>> {
        configs.iter().map(|config| self.simulate(config)).collect()
    }
}
