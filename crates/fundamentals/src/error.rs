use agora_core::{MarketId, Time};
use thiserror::Error;

/// Errors raised by the fundamental price generator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FundamentalsError {
    #[error("Market {0} is already registered")]
    DuplicateMarket(MarketId),

    #[error("Market {0} is not registered")]
    UnknownMarket(MarketId),

    #[error("Volatility must be non-negative, got {0}")]
    NegativeVolatility(f64),

    #[error("Initial price must be positive, got {0}")]
    NonPositiveInitial(f64),

    #[error("Correlation must lie in [-1, 1], got {0}")]
    CorrelationOutOfRange(f64),

    #[error("Correlation needs two different markets, got {0} twice")]
    SelfCorrelation(MarketId),

    #[error("No correlation set between markets {0} and {1}")]
    UnknownCorrelation(MarketId, MarketId),

    #[error("Covariance matrix is not positive semi-definite; check for inconsistent correlation cycles")]
    NotPositiveSemiDefinite,

    #[error("No fundamental price for market {market_id} at time {time}")]
    MissingPrice { market_id: MarketId, time: Time },
}

pub type FundamentalsResult<T> = std::result::Result<T, FundamentalsError>;
