use std::fmt;

use serde::{Deserialize, Serialize};

/// Order kinds accepted by a continuous double auction market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Takes liquidity at the best opposing price, carries no price
    Market,
    /// Executes at the given price or better
    Limit,
}

impl OrderKind {
    /// Stable numeric identifier used in log records
    pub fn kind_id(&self) -> u8 {
        match self {
            OrderKind::Market => 0,
            OrderKind::Limit => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderKind::Market => "MARKET_ORDER",
            OrderKind::Limit => "LIMIT_ORDER",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
