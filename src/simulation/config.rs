//! Simulation controls and cooperative cancellation

use crate::error::{ReservingError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default seed of the first batch
pub const DEFAULT_MAIN_SEED: u64 = 202_260_011;

/// Configuration for a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Total number of simulated paths (rows of the result matrix)
    pub sim_total: usize,

    /// Paths per batch; every batch gets its own seed
    pub batch_sim: usize,

    /// Seed of batch 0; batch `b` uses `main_seed + b`
    pub main_seed: u64,

    /// Run batches on the rayon thread pool
    /// Results are identical either way
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sim_total: 1000,
            batch_sim: 1000,
            main_seed: DEFAULT_MAIN_SEED,
            parallel: true,
        }
    }
}

impl SimulationConfig {
    /// Small run for spot checks
    pub fn quick() -> Self {
        Self {
            sim_total: 200,
            batch_sim: 100,
            ..Default::default()
        }
    }

    /// `sim_total` paths in batches of `batch_sim`
    pub fn with_paths(sim_total: usize, batch_sim: usize) -> Self {
        Self {
            sim_total,
            batch_sim,
            ..Default::default()
        }
    }

    /// Set the main seed
    pub fn with_seed(mut self, main_seed: u64) -> Self {
        self.main_seed = main_seed;
        self
    }

    /// Run batches on the calling thread only
    pub fn serial(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Number of batches: `ceil(sim_total / batch_sim)`
    pub fn batch_count(&self) -> usize {
        if self.batch_sim == 0 {
            0
        } else {
            self.sim_total.div_ceil(self.batch_sim)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sim_total == 0 {
            return Err(ReservingError::InvalidParameter("sim_total must be at least 1".into()));
        }
        if self.batch_sim == 0 {
            return Err(ReservingError::InvalidParameter("batch_sim must be at least 1".into()));
        }
        Ok(())
    }
}

/// Shared flag checked between batches
///
/// Cancelling never interrupts a batch that has already started, so every
/// completed batch matches an uncancelled run.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
