use agora_config::Settings;
use agora_core::{MarketId, Time};
use agora_market::{Exchange, MarketError};
use log::info;

use crate::error::invalid;
use crate::event::{Event, EventBase};
use crate::{EventHook, EventResult, HookType, MarketFilter};

/// Scales the fundamental price of one market for a few steps
///
/// Fires before the step of the target market at
/// `session start + triggerTime` and the `shockTimeLength - 1` steps after it.
#[derive(Debug, Clone)]
pub struct FundamentalPriceShock {
    base: EventBase,
    target_market: MarketId,
    trigger_time: Time,
    price_change_rate: f64,
    shock_time_length: Time,
    enabled: bool,
}

impl FundamentalPriceShock {
    pub fn new(base: EventBase) -> Self {
        Self {
            base,
            target_market: 0,
            trigger_time: 0,
            price_change_rate: 0.0,
            shock_time_length: 1,
            enabled: true,
        }
    }

    /// Absolute time of the first shocked step
    pub fn trigger_time(&self) -> Time {
        self.trigger_time
    }

    pub fn target_market(&self) -> MarketId {
        self.target_market
    }
}

impl Event for FundamentalPriceShock {
    fn base(&self) -> &EventBase {
        &self.base
    }

    fn class_name(&self) -> &str {
        "FundamentalPriceShock"
    }

    fn setup(&mut self, settings: &Settings, exchange: &Exchange) -> EventResult<()> {
        settings.reject_deprecated("triggerDays", "triggerTime")?;
        let target = settings.required_str("target")?;
        self.target_market = exchange
            .market_id(target)
            .ok_or_else(|| MarketError::UnknownMarketName(target.to_string()))?;
        self.trigger_time = self.base.session_start_time() + settings.required_i64("triggerTime")?;
        self.price_change_rate = settings.required_f64("priceChangeRate")?;
        if let Some(length) = settings.optional_i64("shockTimeLength")? {
            if length < 1 {
                return Err(invalid("shockTimeLength", "must be at least 1"));
            }
            self.shock_time_length = length;
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
        let hook = EventHook::new(self.event_id(), HookType::Market, true)?
            .at_times(self.trigger_time..self.trigger_time + self.shock_time_length)
            .for_markets(MarketFilter::Instance(self.target_market))?;
        Ok(vec![hook])
    }

    fn before_step_for_market(&mut self, exchange: &mut Exchange, market_id: MarketId) -> EventResult<()> {
        let scale = 1.0 + self.price_change_rate;
        exchange.change_fundamental_price(market_id, scale)?;
        info!(
            "{}: fundamental price of market {} scaled by {} at t={}",
            self.name(),
            market_id,
            scale,
            exchange.market(market_id)?.get_time()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{event_base, exchange, settings};
    use crate::EventError;
    use agora_config::ConfigError;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn shock(start_time: Time) -> FundamentalPriceShock {
        let exchange = exchange(&[300.0]);
        let mut shock = FundamentalPriceShock::new(event_base(start_time));
        shock
            .setup(
                &settings(json!({
                    "target": "Market-0",
                    "triggerTime": 5,
                    "priceChangeRate": -0.1,
                    "shockTimeLength": 2,
                })),
                &exchange,
            )
            .unwrap();
        shock
    }

    #[test]
    fn test_hooks_cover_shock_window() {
        let shock = shock(10);
        assert_eq!(shock.trigger_time(), 15);
        let hooks = shock.hook_registration().unwrap();
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].times, Some(vec![15, 16]));
        assert_eq!(hooks[0].market_filter, Some(MarketFilter::Instance(0)));
        assert!(hooks[0].is_before);
    }

    #[test]
    fn test_shock_scales_fundamental() {
        let mut exchange = exchange(&[300.0]);
        let mut shock = shock(0);
        shock.before_step_for_market(&mut exchange, 0).unwrap();
        assert_relative_eq!(exchange.market(0).unwrap().fundamental_price().unwrap(), 270.0);
    }

    #[test]
    fn test_disabled_registers_nothing() {
        let exchange = exchange(&[300.0]);
        let mut shock = FundamentalPriceShock::new(event_base(0));
        shock
            .setup(
                &settings(json!({
                    "target": "Market-0",
                    "triggerTime": 1,
                    "priceChangeRate": 0.1,
                    "enabled": false,
                })),
                &exchange,
            )
            .unwrap();
        assert!(shock.hook_registration().unwrap().is_empty());
    }

    #[test]
    fn test_trigger_days_is_rejected() {
        let exchange = exchange(&[300.0]);
        let mut shock = FundamentalPriceShock::new(event_base(0));
        let result = shock.setup(
            &settings(json!({
                "target": "Market-0",
                "triggerDays": 1,
                "priceChangeRate": 0.1,
            })),
            &exchange,
        );
        assert!(matches!(
            result,
            Err(EventError::Config(ConfigError::Deprecated { .. }))
        ));
    }
}
