use agora_core::Session;
use log::warn;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde_json::Value;

use crate::builder::SimulationBuilder;
use crate::config::RunnerConfig;
use crate::registry::ClassRegistry;
use crate::runner::Runner;
use crate::simulator::{ActionBatch, Simulator, split_agents};
use crate::{SimulationError, SimulationResult};

/// Runner that asks the sampled normal agents for their actions on a worker
/// pool
///
/// The first `max_normal_orders` agents of the shuffled order are sampled,
/// whether or not they end up submitting. Their actions are then applied
/// serially in sampled order, so a run only depends on the seed.
pub struct AgentParallelRunner {
    simulator: Simulator,
    pool: ThreadPool,
    num_parallel: usize,
}

impl AgentParallelRunner {
    pub fn new(simulator: Simulator, num_parallel: usize) -> SimulationResult<Self> {
        let num_parallel = num_parallel.max(1);
        let max_normal_orders = simulator
            .sessions()
            .iter()
            .map(|session| session.max_normal_orders)
            .max()
            .unwrap_or(0);
        if num_parallel > max_normal_orders {
            warn!(
                "numParallel = {} exceeds the largest maxNormalOrders = {}; extra workers stay idle",
                num_parallel, max_normal_orders
            );
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_parallel)
            .thread_name(|index| format!("agora-agent-{index}"))
            .build()
            .map_err(|e| SimulationError::ThreadPool(e.to_string()))?;
        Ok(Self {
            simulator,
            pool,
            num_parallel,
        })
    }

    pub fn from_config(
        config: &Value,
        registry: &ClassRegistry,
        runner_config: &RunnerConfig,
    ) -> SimulationResult<Self> {
        let builder = SimulationBuilder::new(config, registry, runner_config.resolve_seed())?;
        let num_parallel = runner_config.resolve_num_parallel(builder.num_parallel()?);
        Self::new(builder.build()?, num_parallel)
    }

    pub fn num_parallel(&self) -> usize {
        self.num_parallel
    }

    pub fn into_simulator(self) -> Simulator {
        self.simulator
    }
}

impl Runner for AgentParallelRunner {
    fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.simulator
    }

    fn collect_normal_actions(&mut self, session: &Session) -> SimulationResult<Vec<ActionBatch>> {
        let mut sampled = self.simulator.shuffled_normal_agents();
        sampled.truncate(session.max_normal_orders);
        if sampled.is_empty() {
            return Ok(Vec::new());
        }

        let (mut agents, exchange) = split_agents(&mut self.simulator, &sampled)?;
        let results: Vec<_> = self.pool.install(|| {
            agents
                .par_iter_mut()
                .map(|agent| (agent.agent_id(), agent.submit_orders(exchange)))
                .collect()
        });

        let mut batches = Vec::with_capacity(results.len());
        for (agent_id, result) in results {
            let actions = result?;
            if !actions.is_empty() {
                batches.push((agent_id, actions));
            }
        }
        Ok(batches)
    }
}
