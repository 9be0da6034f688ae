//! Fundamental price processes for agora markets.
//!
//! Every market registered here follows a geometric Brownian motion; markets
//! can be pairwise correlated. Paths are generated lazily and can be rewound
//! when parameters change mid-simulation.

mod cholesky;
mod error;
mod fundamentals;

pub use cholesky::cholesky;
pub use error::{FundamentalsError, FundamentalsResult};
pub use fundamentals::{DEFAULT_CHUNK_SIZE, Fundamentals};
