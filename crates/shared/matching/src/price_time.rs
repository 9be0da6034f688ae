use agora_core::{Order, Price};
use agora_ports::MatchingAlgorithm;

/// Standard price-time priority policy for a continuous double auction
///
/// Execution price for a crossing pair:
/// 1. Both limit, placed at the same step: the order with the smaller id sets the price
/// 2. Both limit, placed at different steps: the earlier (resting) order sets the price
/// 3. Market against limit: the limit price
/// 4. Market against market: deferred to the next priced pair of the sweep
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceTimeMatching;

impl PriceTimeMatching {
    pub fn new() -> Self {
        Self
    }
}

impl MatchingAlgorithm for PriceTimeMatching {
    fn name(&self) -> &str {
        "Price-Time Priority"
    }

    fn can_match(&self, buy_order: &Order, sell_order: &Order) -> bool {
        match (buy_order.price, sell_order.price) {
            // Both are limit orders - price must cross
            (Some(buy_price), Some(sell_price)) => buy_price >= sell_price,
            // At least one is a market order - can match
            _ => true,
        }
    }

    fn execution_price(&self, buy_order: &Order, sell_order: &Order) -> Option<Price> {
        match (buy_order.price, sell_order.price) {
            (Some(buy_price), Some(sell_price)) => {
                let buy_first = if buy_order.placed_at == sell_order.placed_at {
                    buy_order.order_id < sell_order.order_id
                } else {
                    buy_order.placed_at < sell_order.placed_at
                };
                Some(if buy_first { buy_price } else { sell_price })
            }
            (None, Some(sell_price)) => Some(sell_price),
            (Some(buy_price), None) => Some(buy_price),
            (None, None) => None,
        }
    }
}
