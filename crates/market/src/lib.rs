//! Agora markets
//!
//! A [`Market`] keeps both sides of an order book together with the per-step
//! price series the agents observe. Index markets are markets whose
//! fundamental is the share-weighted average of their components. The
//! [`Exchange`] arena owns every market and the fundamental generator, and is
//! the only way the rest of the simulator reaches them.

mod error;
mod exchange;
mod index;
mod market;
mod settings;

pub use error::{MarketError, MarketResult};
pub use exchange::{Exchange, FundamentalParams};
pub use market::{Market, MarketKind};
pub use settings::MarketSettings;
