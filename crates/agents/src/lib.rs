//! Agora Agents
//!
//! The [`Agent`] contract the simulator drives, the [`AgentBase`] portfolio
//! every agent carries, and the shipped strategies:
//!
//! - **FCNAgent**: fundamental, chart and noise forecasts blended into one
//!   limit order per market
//! - **MarketShareFCNAgent**: FCN on one of two markets, picked by recent
//!   traded volume
//! - **MarketMakerAgent** (high frequency): symmetric quotes around the best
//!   prices of its markets
//! - **ArbitrageAgent** (high frequency): index versus component trades
//! - **TestAgent**: random limit orders

pub mod agent;
pub mod arbitrage;
pub mod error;
pub mod fcn;
pub mod market_maker;
pub mod market_share_fcn;
pub mod test_agent;

#[cfg(test)]
mod testing;

pub use agent::{Agent, AgentBase};
pub use arbitrage::ArbitrageAgent;
pub use error::{AgentError, AgentResult};
pub use fcn::{FcnAgent, MarginType};
pub use market_maker::MarketMakerAgent;
pub use market_share_fcn::MarketShareFcnAgent;
pub use test_agent::TestAgent;
