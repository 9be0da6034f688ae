/// Simulation time, in integer steps. `-1` before the first step.
pub type Time = i64;

/// Prices are plain floating point values; tick alignment is enforced by markets.
pub type Price = f64;

/// Share counts. Signed so that agent positions may go short.
pub type Volume = i64;

/// Index of an agent in the simulator registry
pub type AgentId = usize;

/// Index of a market in the exchange arena
pub type MarketId = usize;

/// Market-local order identifier, assigned sequentially on acceptance
pub type OrderId = u64;

/// Index of an event in the simulator registry
pub type EventId = usize;

/// Index of a session in the simulator registry
pub type SessionId = usize;
