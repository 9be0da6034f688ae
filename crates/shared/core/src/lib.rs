//! Agora Core Domain
//!
//! Pure domain types for the agora market simulator.
//! This crate contains no I/O and no randomness, and is 100% unit testable.
//!
//! - **Values**: integer step time, ids, prices and share volumes
//! - **Entities**: orders, cancels, agent actions and sessions
//! - **Logs**: the record stream emitted while a simulation runs

pub mod entities;
pub mod logs;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{Action, Cancel, Order, OrderError, OrderKind, Session, Side};
pub use logs::{
    CancelLog, ExecutionLog, ExpirationLog, Log, MarketStepLog, OrderLog, SessionBeginLog,
    SessionEndLog, SimulationBeginLog, SimulationEndLog,
};
pub use values::{AgentId, EventId, MarketId, OrderId, Price, SessionId, Time, Volume};
