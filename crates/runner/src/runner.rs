//! Step loop shared by the sequential and agent-parallel runners

use agora_core::Session;
use serde_json::Value;

use crate::builder::SimulationBuilder;
use crate::config::RunnerConfig;
use crate::registry::ClassRegistry;
use crate::simulator::{ActionBatch, Simulator};
use crate::SimulationResult;

/// Drives a [`Simulator`] through every session
///
/// Implementors only decide how normal-frequency agents are asked for
/// actions; everything else, including the application order of those
/// actions, is fixed by [`Runner::run`].
pub trait Runner {
    fn simulator(&self) -> &Simulator;

    fn simulator_mut(&mut self) -> &mut Simulator;

    /// Actions of the normal agents sampled for this step, in the order they
    /// must be applied
    fn collect_normal_actions(&mut self, session: &Session) -> SimulationResult<Vec<ActionBatch>>;

    fn run(&mut self) -> SimulationResult<()> {
        self.simulator_mut().begin_simulation();
        let sessions = self.simulator().sessions().to_vec();
        for session in &sessions {
            self.simulator_mut().begin_session(session)?;
            for _ in 0..session.iteration_steps {
                self.run_step(session)?;
            }
            self.simulator_mut().end_session(session)?;
        }
        self.simulator_mut().end_simulation()
    }

    fn run_step(&mut self, session: &Session) -> SimulationResult<()> {
        self.simulator_mut().begin_step(session)?;
        if session.with_order_placement {
            let batches = self.collect_normal_actions(session)?;
            self.simulator_mut().handle_actions(session, batches)?;
            self.simulator_mut().run_high_frequency_agents(session)?;
        }
        self.simulator_mut().end_step(session)
    }
}

/// Single-threaded runner: agents are asked one after the other until
/// `max_normal_orders` of them submitted something
pub struct SequentialRunner {
    simulator: Simulator,
}

impl SequentialRunner {
    pub fn new(simulator: Simulator) -> Self {
        Self { simulator }
    }

    pub fn from_config(
        config: &Value,
        registry: &ClassRegistry,
        runner_config: &RunnerConfig,
    ) -> SimulationResult<Self> {
        let builder = SimulationBuilder::new(config, registry, runner_config.resolve_seed())?;
        Ok(Self::new(builder.build()?))
    }

    pub fn into_simulator(self) -> Simulator {
        self.simulator
    }
}

impl Runner for SequentialRunner {
    fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.simulator
    }

    fn collect_normal_actions(&mut self, session: &Session) -> SimulationResult<Vec<ActionBatch>> {
        self.simulator.collect_normal_actions(session)
    }
}
