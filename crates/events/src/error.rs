use agora_config::ConfigError;
use agora_market::MarketError;
use thiserror::Error;

use crate::HookType;

/// Event setup and callback errors
#[derive(Error, Debug)]
pub enum EventError {
    #[error("{0:?} hooks can only run after the action")]
    BeforeHookNotAllowed(HookType),

    #[error("Market filters only apply to market hooks, not {0:?}")]
    FilterNotAllowed(HookType),

    #[error("Invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Market error: {0}")]
    Market(#[from] MarketError),
}

pub type EventResult<T> = std::result::Result<T, EventError>;

pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> EventError {
    EventError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}
