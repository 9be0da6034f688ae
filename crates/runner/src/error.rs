use agora_agents::AgentError;
use agora_config::ConfigError;
use agora_core::{AgentId, EventId, OrderError};
use agora_events::EventError;
use agora_market::MarketError;
use thiserror::Error;

/// Anything that aborts a simulation run
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Agent {author} submitted an action for agent {claimed}")]
    SpoofedAction { author: AgentId, claimed: AgentId },

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("Agent registered with id {got}, expected {expected}")]
    UnexpectedAgentId { expected: AgentId, got: AgentId },

    #[error("Event registered with id {got}, expected {expected}")]
    UnexpectedEventId { expected: EventId, got: EventId },

    #[error("Event {event_id} registered a hook for event {claimed}")]
    ForeignHook { event_id: EventId, claimed: EventId },

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error("Log output failed: {0}")]
    LogOutput(#[from] std::io::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Invalid order: {0}")]
    Order(#[from] OrderError),
}

pub type SimulationResult<T> = std::result::Result<T, SimulationError>;
