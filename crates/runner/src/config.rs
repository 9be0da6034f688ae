use std::thread;

use rand::Rng;

/// Runner options that do not live in the simulation document
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Root seed; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Worker threads for the agent-parallel runner. Takes precedence over
    /// `simulation.numParallel`.
    pub num_parallel: Option<usize>,
}

impl RunnerConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| rand::thread_rng().r#gen())
    }

    /// Explicit setting, then the document's `numParallel`, then one thread
    /// less than the machine offers
    pub fn resolve_num_parallel(&self, from_document: Option<usize>) -> usize {
        self.num_parallel
            .or(from_document)
            .unwrap_or_else(default_num_parallel)
            .max(1)
    }
}

fn default_num_parallel() -> usize {
    thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}
