use agora_config::ConfigError;
use agora_core::{AgentId, MarketId};
use agora_market::MarketError;
use thiserror::Error;

/// Agent setup and decision errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Market {market_id} is not accessible for agent {agent_id}")]
    NotAccessible { agent_id: AgentId, market_id: MarketId },

    #[error("Market {market_id} is already accessible for agent {agent_id}")]
    AlreadyAccessible { agent_id: AgentId, market_id: MarketId },

    #[error("Invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Agent {agent_id} computed a non-finite {quantity}")]
    NonFinite {
        agent_id: AgentId,
        quantity: &'static str,
    },

    #[error("Components of index market {0} must have the same outstanding shares")]
    UnequalOutstandingShares(MarketId),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Market error: {0}")]
    Market(#[from] MarketError),
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;

pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> AgentError {
    AgentError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}
