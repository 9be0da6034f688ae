use agora_config::Settings;
use agora_core::{MarketId, Order, OrderKind, Side, Time, Volume};
use agora_market::{Exchange, MarketError};
use log::info;

use crate::error::invalid;
use crate::event::{Event, EventBase};
use crate::{EventHook, EventResult, HookType};

/// Turns one ordinary order into a fat-finger order
///
/// The first order for the target market that reaches the exchange at
/// `session start + triggerTime` is rewritten into a limit order at
/// `market_price * (1 + priceChangeRate)`, buying for a positive rate and
/// selling otherwise. Later orders pass untouched.
#[derive(Debug, Clone)]
pub struct OrderMistakeShock {
    base: EventBase,
    target_market: MarketId,
    trigger_time: Time,
    price_change_rate: f64,
    order_volume: Volume,
    order_time_length: Time,
    enabled: bool,
    fired: bool,
}

impl OrderMistakeShock {
    pub fn new(base: EventBase) -> Self {
        Self {
            base,
            target_market: 0,
            trigger_time: 0,
            price_change_rate: 0.0,
            order_volume: 1,
            order_time_length: 1,
            enabled: true,
            fired: false,
        }
    }

    pub fn trigger_time(&self) -> Time {
        self.trigger_time
    }

    /// Whether an order has been rewritten yet
    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

impl Event for OrderMistakeShock {
    fn base(&self) -> &EventBase {
        &self.base
    }

    fn class_name(&self) -> &str {
        "OrderMistakeShock"
    }

    fn setup(&mut self, settings: &Settings, exchange: &Exchange) -> EventResult<()> {
        let target = settings.required_str("target")?;
        self.target_market = exchange
            .market_id(target)
            .ok_or_else(|| MarketError::UnknownMarketName(target.to_string()))?;
        self.trigger_time = self.base.session_start_time() + settings.required_i64("triggerTime")?;
        self.price_change_rate = settings.required_f64("priceChangeRate")?;
        self.order_volume = settings.required_i64("orderVolume")?;
        if self.order_volume <= 0 {
            return Err(invalid("orderVolume", "must be positive"));
        }
        self.order_time_length = settings.required_i64("orderTimeLength")?;
        if let Some(enabled) = settings.optional_bool("enabled")? {
            self.enabled = enabled;
        }
        Ok(())
    }

    fn hook_registration(&self) -> EventResult<Vec<EventHook>> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        let hook = EventHook::new(self.event_id(), HookType::Order, true)?.at_times([self.trigger_time]);
        Ok(vec![hook])
    }

    fn before_order(&mut self, exchange: &mut Exchange, order: &mut Order) -> EventResult<()> {
        if self.fired || order.market_id != self.target_market {
            return Ok(());
        }
        let market = exchange.market(self.target_market)?;
        if market.get_time() != self.trigger_time {
            return Ok(());
        }

        order.side = if self.price_change_rate > 0.0 {
            Side::Buy
        } else {
            Side::Sell
        };
        order.kind = OrderKind::Limit;
        order.price = Some(market.market_price()? * (1.0 + self.price_change_rate));
        order.volume = self.order_volume;
        order.ttl = Some(self.order_time_length);
        self.fired = true;
        info!(
            "{}: order of agent {} rewritten to {:?} {} @ {:?}",
            self.name(),
            order.agent_id,
            order.side,
            order.volume,
            order.price
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{event_base, exchange, settings};
    use serde_json::json;

    fn mistake(rate: f64) -> OrderMistakeShock {
        let exchange = exchange(&[300.0, 200.0]);
        let mut shock = OrderMistakeShock::new(event_base(0));
        shock
            .setup(
                &settings(json!({
                    "target": "Market-0",
                    "triggerTime": 0,
                    "priceChangeRate": rate,
                    "orderVolume": 50,
                    "orderTimeLength": 3,
                })),
                &exchange,
            )
            .unwrap();
        shock
    }

    #[test]
    fn test_hook_at_trigger_time() {
        let hooks = mistake(-0.05).hook_registration().unwrap();
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].hook_type, HookType::Order);
        assert_eq!(hooks[0].times, Some(vec![0]));
    }

    #[test]
    fn test_first_target_order_is_rewritten() {
        let mut exchange = exchange(&[300.0, 200.0]);
        let mut shock = mistake(-0.05);

        let mut other = Order::market(1, 1, Side::Buy, 1);
        shock.before_order(&mut exchange, &mut other).unwrap();
        assert_eq!(other, Order::market(1, 1, Side::Buy, 1));

        let mut order = Order::market(1, 0, Side::Buy, 1);
        shock.before_order(&mut exchange, &mut order).unwrap();
        assert!(shock.has_fired());
        assert_eq!(order.agent_id, 1);
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.kind, OrderKind::Limit);
        assert_eq!(order.volume, 50);
        assert_eq!(order.ttl, Some(3));
        assert!((order.price.unwrap() - 285.0).abs() < 1e-9);

        let mut later = Order::limit(2, 0, Side::Buy, 299.0, 2);
        shock.before_order(&mut exchange, &mut later).unwrap();
        assert_eq!(later, Order::limit(2, 0, Side::Buy, 299.0, 2));
    }

    #[test]
    fn test_positive_rate_buys() {
        let mut exchange = exchange(&[300.0]);
        let mut shock = mistake(0.1);
        let mut order = Order::limit(3, 0, Side::Sell, 301.0, 1);
        shock.before_order(&mut exchange, &mut order).unwrap();
        assert_eq!(order.side, Side::Buy);
    }
}
