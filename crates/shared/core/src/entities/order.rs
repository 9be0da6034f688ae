use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{OrderKind, Side};
use crate::values::{AgentId, MarketId, OrderId, Price, Time, Volume};

/// Reasons an order cannot be submitted as constructed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Market orders cannot carry a price")]
    PricedMarketOrder,

    #[error("Limit orders require a price")]
    MissingLimitPrice,

    #[error("Order volume must be positive, got {0}")]
    NonPositiveVolume(Volume),

    #[error("Order ttl must be positive, got {0}")]
    NonPositiveTtl(Time),
}

/// A buy or sell intention submitted by an agent to one market.
///
/// `order_id` and `placed_at` stay `None` until the market accepts the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Option<OrderId>,
    pub agent_id: AgentId,
    pub market_id: MarketId,
    pub side: Side,
    pub kind: OrderKind,
    pub volume: Volume,
    /// Required for limit orders, absent for market orders
    pub price: Option<Price>,
    pub placed_at: Option<Time>,
    /// Number of steps the order may rest unfilled
    pub ttl: Option<Time>,
    pub canceled: bool,
}

impl Order {
    /// Create a limit order
    pub fn limit(
        agent_id: AgentId,
        market_id: MarketId,
        side: Side,
        price: Price,
        volume: Volume,
    ) -> Self {
        Self {
            order_id: None,
            agent_id,
            market_id,
            side,
            kind: OrderKind::Limit,
            volume,
            price: Some(price),
            placed_at: None,
            ttl: None,
            canceled: false,
        }
    }

    /// Create a market order
    pub fn market(agent_id: AgentId, market_id: MarketId, side: Side, volume: Volume) -> Self {
        Self {
            order_id: None,
            agent_id,
            market_id,
            side,
            kind: OrderKind::Market,
            volume,
            price: None,
            placed_at: None,
            ttl: None,
            canceled: false,
        }
    }

    pub fn with_ttl(mut self, ttl: Time) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn is_buy(&self) -> bool {
        self.side.is_buy()
    }

    pub fn is_placed(&self) -> bool {
        self.placed_at.is_some() && self.order_id.is_some()
    }

    /// Validate the order based on kind requirements
    pub fn validate(&self) -> Result<(), OrderError> {
        match (self.kind, self.price) {
            (OrderKind::Market, Some(_)) => return Err(OrderError::PricedMarketOrder),
            (OrderKind::Limit, None) => return Err(OrderError::MissingLimitPrice),
            _ => {}
        }
        if self.volume <= 0 {
            return Err(OrderError::NonPositiveVolume(self.volume));
        }
        if let Some(ttl) = self.ttl {
            if ttl <= 0 {
                return Err(OrderError::NonPositiveTtl(ttl));
            }
        }
        Ok(())
    }

    /// Last step at which the order may still rest in the book
    pub fn expiration_time(&self) -> Option<Time> {
        match (self.placed_at, self.ttl) {
            (Some(placed_at), Some(ttl)) => Some(placed_at + ttl),
            _ => None,
        }
    }

    /// An order placed at `p` with ttl `τ` is expired at every `t > p + τ`
    pub fn is_expired(&self, time: Time) -> bool {
        self.expiration_time().is_some_and(|until| until < time)
    }
}

/// Request to withdraw a resting order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancel {
    pub order_id: OrderId,
    pub market_id: MarketId,
    pub agent_id: AgentId,
    pub side: Side,
    /// Set by the order book when the cancel is accepted
    pub placed_at: Option<Time>,
}

impl Cancel {
    pub fn new(order_id: OrderId, market_id: MarketId, agent_id: AgentId, side: Side) -> Self {
        Self {
            order_id,
            market_id,
            agent_id,
            side,
            placed_at: None,
        }
    }

    /// Build a cancel for an order that has been placed
    pub fn for_order(order: &Order) -> Option<Self> {
        order
            .order_id
            .map(|order_id| Self::new(order_id, order.market_id, order.agent_id, order.side))
    }
}

/// What an agent hands back to the driver at each invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Order(Order),
    Cancel(Cancel),
}

impl Action {
    /// Agent that authored the action, used for spoofing checks
    pub fn agent_id(&self) -> AgentId {
        match self {
            Action::Order(order) => order.agent_id,
            Action::Cancel(cancel) => cancel.agent_id,
        }
    }

    pub fn market_id(&self) -> MarketId {
        match self {
            Action::Order(order) => order.market_id,
            Action::Cancel(cancel) => cancel.market_id,
        }
    }
}

impl From<Order> for Action {
    fn from(order: Order) -> Self {
        Action::Order(order)
    }
}

impl From<Cancel> for Action {
    fn from(cancel: Cancel) -> Self {
        Action::Cancel(cancel)
    }
}
