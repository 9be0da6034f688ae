//! Agora Runner - Simulation Driver
//!
//! Turns a JSON simulation document into a running market simulation:
//!
//! - **Builder**: markets, fundamentals, agents, sessions and events from
//!   the document, seeded from one root seed
//! - **Registry**: class name to factory lookup, open to user classes
//! - **Simulator**: step building blocks, order intake, settlement and
//!   event dispatch
//! - **Runners**: the step loop, sequential or with agents asked in parallel
//! - **Loggers**: sinks receiving every simulation record
//!
//! ## Step
//!
//! ```text
//!   advance markets ──► before-step hooks ──► normal agents ──► high-frequency agents
//!                                                  │                     │
//!                                                  ▼                     ▼
//!                              before-order hook ─► market ─► after-order hook
//!                                                  │
//!                                                  ▼
//!                                    execution ─► settlement ─► after-execution hook
//!                                                  │
//!                                                  ▼
//!                                           after-step hooks ──► log sinks
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod loggers;
pub mod parallel;
pub mod registry;
pub mod runner;
pub mod session;
pub mod simulator;

#[cfg(test)]
mod testing;

pub use builder::SimulationBuilder;
pub use config::RunnerConfig;
pub use error::{SimulationError, SimulationResult};
pub use loggers::{JsonLinesLogger, LogBus, MarketStepPrintLogger, MarketStepSaver, MemoryLogger};
pub use parallel::AgentParallelRunner;
pub use registry::ClassRegistry;
pub use runner::{Runner, SequentialRunner};
pub use session::SessionSettings;
pub use simulator::{ActionBatch, Simulator};
