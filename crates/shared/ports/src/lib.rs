//! Agora Ports
//!
//! Port definitions (traits) for the agora market simulator.
//! These define the boundaries between the matching core and the sinks or
//! policies plugged into it.

mod error;
mod logger;
mod matching;

pub use error::{BookError, BookResult};
pub use logger::Logger;
pub use matching::MatchingAlgorithm;
