//! Agora Events
//!
//! Events hook into fixed points of the step loop. Each event returns its
//! [`EventHook`]s once at setup; the simulator files them in a dispatch
//! table and calls the matching [`Event`] callbacks.
//!
//! Shipped events:
//! - **FundamentalPriceShock**: scale a market's fundamental price
//! - **OrderMistakeShock**: rewrite one order into a fat-finger order
//! - **PriceLimitRule**: clamp limit prices to a band
//! - **TradingHaltRule**: suspend a market after a large move

pub mod error;
pub mod event;
pub mod fundamental_price_shock;
pub mod hook;
pub mod order_mistake_shock;
pub mod price_limit_rule;
pub mod trading_halt_rule;

#[cfg(test)]
mod testing;

pub use error::{EventError, EventResult};
pub use event::{Event, EventBase};
pub use fundamental_price_shock::FundamentalPriceShock;
pub use hook::{DispatchPoint, EventHook, HookType, MarketFilter};
pub use order_mistake_shock::OrderMistakeShock;
pub use price_limit_rule::PriceLimitRule;
pub use trading_halt_rule::TradingHaltRule;
