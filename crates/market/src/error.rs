use agora_config::ConfigError;
use agora_core::{AgentId, MarketId, OrderError, OrderId, Time};
use agora_fundamentals::FundamentalsError;
use agora_ports::BookError;
use thiserror::Error;

/// Market-level errors. Every variant is a contract violation or a setup
/// failure; a market that simply has nothing to execute never errors.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Order for market {got} was sent to market {expected}")]
    WrongMarket { expected: MarketId, got: MarketId },

    #[error("Order has already been submitted")]
    AlreadySubmitted,

    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    #[error("Agent {agent_id} cannot cancel order {order_id} owned by agent {owner}")]
    NotOrderOwner {
        order_id: OrderId,
        agent_id: AgentId,
        owner: AgentId,
    },

    #[error("Market {0} is not running")]
    NotRunning(MarketId),

    #[error("Market {0} has not started yet")]
    NotStarted(MarketId),

    #[error("Cannot refer to time {requested} in the future of market time {now}")]
    FutureTime { requested: Time, now: Time },

    #[error("Negative time {0}")]
    NegativeTime(Time),

    #[error("{series} is missing at time {time}")]
    MissingValue { series: &'static str, time: Time },

    #[error("Tick size must be positive, got {0}")]
    InvalidTickSize(f64),

    #[error("Price {0} cannot be placed on the tick grid")]
    InvalidPrice(f64),

    #[error("Outstanding shares must be positive, got {0}")]
    InvalidOutstandingShares(i64),

    #[error("Market {0} is not an index market")]
    NotIndexMarket(MarketId),

    #[error("Market {0} is already a component of this index")]
    DuplicateComponent(MarketId),

    #[error("Market {0} needs outstandingShares to be an index component")]
    MissingOutstandingShares(MarketId),

    #[error("Unknown market id: {0}")]
    UnknownMarket(MarketId),

    #[error("Unknown market name: {0}")]
    UnknownMarketName(String),

    #[error("Market name {0} is already registered")]
    DuplicateMarketName(String),

    #[error("Market id {got} does not match registration slot {expected}")]
    UnexpectedMarketId { expected: MarketId, got: MarketId },

    #[error("Order book error: {0}")]
    Book(#[from] BookError),

    #[error("Fundamentals error: {0}")]
    Fundamentals(#[from] FundamentalsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type MarketResult<T> = std::result::Result<T, MarketError>;
