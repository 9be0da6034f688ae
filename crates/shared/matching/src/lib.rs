//! Agora Matching
//!
//! Order book sides and the continuous double auction sweep.
//!
//! - [`OrderBook`]: one side of a book, an indexed priority queue with ttl index
//! - [`PriceTimeMatching`]: execution-price policy (resting order sets the price)
//! - [`plan_sweep`]: pairs the two sides top-down into a batch of [`Fill`]s

mod order_book;
mod price_time;
mod sweep;

pub use order_book::{OrderBook, OrderPriority};
pub use price_time::PriceTimeMatching;
pub use sweep::{Fill, plan_sweep};

// Re-export the trait from ports for convenience
pub use agora_ports::{BookError, BookResult, MatchingAlgorithm};

