//! Simulation log records
//!
//! Records are plain snapshots: they never reference live markets or agents,
//! so sinks can buffer them and serialise them after the step completes.

use serde::{Deserialize, Serialize};

use crate::entities::OrderKind;
use crate::values::{AgentId, MarketId, OrderId, Price, SessionId, Time, Volume};

/// Emitted when a market accepts an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLog {
    pub order_id: OrderId,
    pub market_id: MarketId,
    pub time: Time,
    pub agent_id: AgentId,
    pub is_buy: bool,
    pub kind: OrderKind,
    pub volume: Volume,
    pub price: Option<Price>,
    pub ttl: Option<Time>,
}

/// Emitted when a resting order is withdrawn by its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelLog {
    pub order_id: OrderId,
    pub market_id: MarketId,
    pub cancel_time: Time,
    pub order_time: Time,
    pub agent_id: AgentId,
    pub is_buy: bool,
    pub kind: OrderKind,
    pub volume: Volume,
    pub price: Option<Price>,
    pub ttl: Option<Time>,
}

/// Emitted when an order outlives its ttl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationLog {
    pub order_id: Option<OrderId>,
    pub market_id: MarketId,
    pub time: Time,
    pub order_time: Option<Time>,
    pub agent_id: AgentId,
    pub is_buy: bool,
    pub kind: OrderKind,
    pub volume: Volume,
    pub price: Option<Price>,
    pub ttl: Option<Time>,
}

/// One fill between a buy and a sell order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub market_id: MarketId,
    pub time: Time,
    pub buy_agent_id: AgentId,
    pub sell_agent_id: AgentId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub volume: Volume,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationBeginLog {
    pub n_markets: usize,
    pub n_agents: usize,
    pub n_sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEndLog {
    pub final_time: Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionBeginLog {
    pub session_id: SessionId,
    pub session_name: String,
    pub start_time: Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEndLog {
    pub session_id: SessionId,
    pub session_name: String,
    pub end_time: Time,
}

/// Market state captured at the beginning or end of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStepLog {
    pub session_id: SessionId,
    pub session_name: String,
    pub with_print: bool,
    pub market_id: MarketId,
    pub market_name: String,
    pub market_time: Time,
    pub market_price: Option<Price>,
    pub fundamental_price: Option<Price>,
}

/// Every record a logger sink can receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Log {
    Order(OrderLog),
    Cancel(CancelLog),
    Expiration(ExpirationLog),
    Execution(ExecutionLog),
    SimulationBegin(SimulationBeginLog),
    SimulationEnd(SimulationEndLog),
    SessionBegin(SessionBeginLog),
    SessionEnd(SessionEndLog),
    MarketStepBegin(MarketStepLog),
    MarketStepEnd(MarketStepLog),
}

impl Log {
    /// Simulation time the record refers to, when it has one
    pub fn time(&self) -> Option<Time> {
        match self {
            Log::Order(log) => Some(log.time),
            Log::Cancel(log) => Some(log.cancel_time),
            Log::Expiration(log) => Some(log.time),
            Log::Execution(log) => Some(log.time),
            Log::SimulationBegin(_) => None,
            Log::SimulationEnd(log) => Some(log.final_time),
            Log::SessionBegin(log) => Some(log.start_time),
            Log::SessionEnd(log) => Some(log.end_time),
            Log::MarketStepBegin(log) | Log::MarketStepEnd(log) => Some(log.market_time),
        }
    }
}

macro_rules! impl_from_record {
    ($($record:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$record> for Log {
                fn from(log: $record) -> Self {
                    Log::$variant(log)
                }
            }
        )*
    };
}

impl_from_record! {
    OrderLog => Order,
    CancelLog => Cancel,
    ExpirationLog => Expiration,
    ExecutionLog => Execution,
    SimulationBeginLog => SimulationBegin,
    SimulationEndLog => SimulationEnd,
    SessionBeginLog => SessionBegin,
    SessionEndLog => SessionEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_log_serializes_with_tag() {
        let log = Log::from(ExecutionLog {
            market_id: 0,
            time: 1,
            buy_agent_id: 0,
            sell_agent_id: 1,
            buy_order_id: 0,
            sell_order_id: 1,
            price: 100.0,
            volume: 3,
        });

        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["type"], "execution");
        assert_eq!(json["volume"], 3);
        assert_eq!(log.time(), Some(1));
    }
}
