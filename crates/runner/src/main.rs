//! `agora` - run a simulation document from the command line
//!
//! ```text
//! agora --config config.json --seed 42
//! agora --config config.json --parallel --jsonl logs.jsonl
//! ```
//!
//! Market steps of sessions with `withPrint` go to stdout; `RUST_LOG`
//! controls diagnostics on stderr.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use agora_runner::{
    AgentParallelRunner, ClassRegistry, JsonLinesLogger, MarketStepPrintLogger, Runner, RunnerConfig,
    SequentialRunner,
};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde_json::Value;

/// Discrete-event artificial market simulator
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(version)]
struct Cli {
    /// Simulation document (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Root seed; drawn from entropy when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Ask normal agents for orders on a worker pool
    #[arg(long)]
    parallel: bool,

    /// Worker threads for --parallel, overriding simulation.numParallel
    #[arg(long)]
    num_parallel: Option<usize>,

    /// Also write every record as JSON lines to this file
    #[arg(long)]
    jsonl: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let text = fs::read_to_string(&cli.config)
        .with_context(|| format!("reading {}", cli.config.display()))?;
    let document: Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", cli.config.display()))?;

    let runner_config = RunnerConfig {
        seed: cli.seed,
        num_parallel: cli.num_parallel,
    };
    let registry = ClassRegistry::default();

    let started = Instant::now();
    let mut runner: Box<dyn Runner> = if cli.parallel {
        let runner = AgentParallelRunner::from_config(&document, &registry, &runner_config)?;
        info!("agent-parallel runner with {} workers", runner.num_parallel());
        Box::new(runner)
    } else {
        Box::new(SequentialRunner::from_config(&document, &registry, &runner_config)?)
    };

    let simulator = runner.simulator_mut();
    simulator.add_logger(Box::new(MarketStepPrintLogger::new()));
    if let Some(path) = &cli.jsonl {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        simulator.add_logger(Box::new(JsonLinesLogger::new(BufWriter::new(file))));
    }
    println!("# INITIALIZATION TIME {}", started.elapsed().as_secs_f64());

    let started = Instant::now();
    runner.run().context("simulation aborted")?;
    println!("# EXECUTION TIME {}", started.elapsed().as_secs_f64());
    Ok(())
}
