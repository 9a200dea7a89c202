//! Batched, seeded, parallel execution of simulated paths
//!
//! Each batch owns a deterministic RNG stream seeded from the main seed and
//! its index, draws the parameter uncertainty for all of its paths up front
//! and then runs the paths sequentially. Batches write into disjoint slices
//! of a pre-sized result buffer, so the output does not depend on thread
//! count or scheduling.

use super::config::{CancellationToken, SimulationConfig};
use super::inputs::SimulationInputs;
use super::path::{PathDraws, PathSimulator};
use super::result::{SimulationResult, UltimateEstimate};
use crate::development::DevelopmentStatistics;
use crate::error::{ReservingError, Result};
use crate::triangle::horizon;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{ChiSquared, Distribution, Normal};
use rayon::prelude::*;
use std::time::Instant;

/// Seed of batch `batch_index`
pub fn stream_seed(main_seed: u64, batch_index: usize) -> u64 {
    main_seed.wrapping_add(batch_index as u64)
}

/// Parameter draws of one batch, stored path-major
#[derive(Debug, Clone)]
pub struct BatchDraws {
    n_dev: usize,
    mu: Vec<f64>,
    sigma_part: Vec<f64>,
}

impl BatchDraws {
    /// Draw `mu` and `sigma_part` for `n_paths` paths
    ///
    /// Per development step, all normal draws of the batch come first, then
    /// all chi-square draws. `sigma_part = floor(χ²(df)) · sigma / df` with
    /// `df = max(1, rows - step)`.
    pub fn draw<R: Rng + ?Sized>(
        stats: &DevelopmentStatistics,
        rows: usize,
        n_paths: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let n_dev = stats.len();
        let mut mu = vec![0.0; n_paths * n_dev];
        let mut sigma_part = vec![0.0; n_paths * n_dev];

        for j in 0..n_dev {
            let normal = Normal::new(stats.dev[j], stats.sd[j])
                .map_err(|e| ReservingError::Distribution(format!("normal for step {j}: {e}")))?;
            for s in 0..n_paths {
                mu[s * n_dev + j] = normal.sample(rng);
            }

            let df = horizon::degrees_of_freedom(rows, j) as f64;
            let chi_squared = ChiSquared::new(df)
                .map_err(|e| ReservingError::Distribution(format!("chi-square for step {j}: {e}")))?;
            for s in 0..n_paths {
                sigma_part[s * n_dev + j] = chi_squared.sample(rng).floor() * stats.sigma[j] / df;
            }
        }

        Ok(Self { n_dev, mu, sigma_part })
    }

    pub fn n_paths(&self) -> usize {
        if self.n_dev == 0 {
            0
        } else {
            self.mu.len() / self.n_dev
        }
    }

    /// Draws of path `s` within the batch
    pub fn path(&self, s: usize) -> PathDraws<'_> {
        let range = s * self.n_dev..(s + 1) * self.n_dev;
        PathDraws {
            mu: &self.mu[range.clone()],
            sigma_part: &self.sigma_part[range],
        }
    }
}

/// Runs all batches of one simulation
pub struct BatchDriver<'a> {
    inputs: &'a SimulationInputs,
    simulator: PathSimulator<'a>,
    config: SimulationConfig,
}

impl<'a> BatchDriver<'a> {
    /// Validates `inputs` and `config` before any batch runs
    pub fn new(inputs: &'a SimulationInputs, config: SimulationConfig) -> Result<Self> {
        inputs.validate()?;
        config.validate()?;
        Ok(Self {
            inputs,
            simulator: PathSimulator::new(inputs),
            config,
        })
    }

    pub fn simulator(&self) -> &PathSimulator<'a> {
        &self.simulator
    }

    /// Run every batch and collect the `sim_total x 3` result
    pub fn run(&self, cancel: Option<&CancellationToken>) -> Result<SimulationResult> {
        let start = Instant::now();
        let config = &self.config;
        info!(
            "Simulating {} paths in {} batches of {} (seed {}, {})",
            config.sim_total,
            config.batch_count(),
            config.batch_sim,
            config.main_seed,
            if config.parallel { "parallel" } else { "serial" }
        );

        let mut rows = vec![UltimateEstimate::default(); config.sim_total];
        let run_batch = |(batch, out): (usize, &mut [UltimateEstimate])| -> Result<()> {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(ReservingError::Cancelled { batch });
            }
            self.run_batch(batch, out)
        };

        if config.parallel {
            rows.par_chunks_mut(config.batch_sim).enumerate().try_for_each(run_batch)?;
        } else {
            rows.chunks_mut(config.batch_sim).enumerate().try_for_each(run_batch)?;
        }

        if let Some(row) = rows.iter().position(|r| !r.is_finite()) {
            warn!("Path {} produced a non-finite ultimate", row);
            return Err(ReservingError::NonFiniteUltimate { row });
        }

        info!("Simulation finished in {:.2?}", start.elapsed());
        Ok(SimulationResult::new(rows))
    }

    fn run_batch(&self, batch: usize, out: &mut [UltimateEstimate]) -> Result<()> {
        let seed = stream_seed(self.config.main_seed, batch);
        let mut rng = StdRng::seed_from_u64(seed);
        let draws = BatchDraws::draw(&self.inputs.statistics, self.inputs.rows(), out.len(), &mut rng)?;

        for (s, slot) in out.iter_mut().enumerate() {
            *slot = self.simulator.simulate(&draws.path(s), &mut rng)?;
        }
        debug!("batch {} (seed {}) finished {} paths", batch, seed, out.len());
        Ok(())
    }
}
