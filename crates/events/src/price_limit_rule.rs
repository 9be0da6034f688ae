use agora_config::Settings;
use agora_core::{MarketId, Order, Price};
use agora_market::Exchange;
use log::debug;

use crate::error::invalid;
use crate::event::{Event, EventBase, resolve_targets};
use crate::{EventHook, EventResult, HookType};

/// Clamps limit prices to a band around the opening price
///
/// The band is `[ref * (1 - rate), ref * (1 + rate)]` with `ref` the market
/// price at time 0. Market orders pass through.
#[derive(Debug, Clone)]
pub struct PriceLimitRule {
    base: EventBase,
    target_markets: Vec<MarketId>,
    trigger_change_rate: f64,
    enabled: bool,
    activation_count: u64,
}

impl PriceLimitRule {
    pub fn new(base: EventBase) -> Self {
        Self {
            base,
            target_markets: Vec::new(),
            trigger_change_rate: 0.0,
            enabled: true,
            activation_count: 0,
        }
    }

    /// Number of orders whose price was clamped
    pub fn activation_count(&self) -> u64 {
        self.activation_count
    }

    /// `price` moved into the band around `reference` when it reaches the
    /// band edge
    pub fn limited_price(&self, price: Price, reference: Price) -> Price {
        let threshold = reference * self.trigger_change_rate;
        if (price - reference).abs() < threshold.abs() {
            return price;
        }
        let max_price = reference * (1.0 + self.trigger_change_rate);
        let min_price = reference * (1.0 - self.trigger_change_rate);
        price.max(min_price).min(max_price)
    }
}

impl Event for PriceLimitRule {
    fn base(&self) -> &EventBase {
        &self.base
    }

    fn class_name(&self) -> &str {
        "PriceLimitRule"
    }

    fn setup(&mut self, settings: &Settings, exchange: &Exchange) -> EventResult<()> {
        settings.reject_deprecated("referenceMarket", "targetMarkets")?;
        self.target_markets = resolve_targets(settings, exchange)?;
        self.trigger_change_rate = settings.required_f64("triggerChangeRate")?;
        if self.trigger_change_rate < 0.0 {
            return Err(invalid("triggerChangeRate", "must be non-negative"));
        }
        if let Some(enabled) = settings.optional_bool("enabled")? {
            self.enabled = enabled;
        }
        Ok(())
    }

    fn hook_registration(&self) -> EventResult<Vec<EventHook>> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        Ok(vec![EventHook::new(self.event_id(), HookType::Order, true)?])
    }

    fn before_order(&mut self, exchange: &mut Exchange, order: &mut Order) -> EventResult<()> {
        if !self.target_markets.contains(&order.market_id) {
            return Ok(());
        }
        let Some(price) = order.price else {
            return Ok(());
        };
        let reference = exchange.market(order.market_id)?.get_market_price(0)?;
        let limited = self.limited_price(price, reference);
        if limited != price {
            debug!(
                "{}: order price {} limited to {} on market {}",
                self.name(),
                price,
                limited,
                order.market_id
            );
            order.price = Some(limited);
            self.activation_count += 1;
        }
        Ok(())
    }
}
