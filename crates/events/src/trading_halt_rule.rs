use std::collections::BTreeMap;

use agora_config::Settings;
use agora_core::{ExecutionLog, MarketId, Time};
use agora_market::Exchange;
use log::info;

use crate::error::invalid;
use crate::event::{Event, EventBase, resolve_targets};
use crate::{EventHook, EventResult, HookType};

const DEFAULT_HALTING_TIME_LENGTH: Time = 1;

/// Circuit breaker suspending a market after a large move
///
/// After every execution on a target market, the market price is compared
/// with the price at time 0. A move of at least
/// `rate * (activations + 1) * reference` stops the market; each activation
/// widens the next threshold. The market reopens before the first step past
/// `halt start + haltingTimeLength`. A market reopened from outside, as
/// when a new session starts, no longer counts as halted.
#[derive(Debug, Clone)]
pub struct TradingHaltRule {
    base: EventBase,
    target_markets: Vec<MarketId>,
    trigger_change_rate: f64,
    halting_time_length: Time,
    enabled: bool,
    activation_count: u64,
    /// Halt start per currently halted market
    halted: BTreeMap<MarketId, Time>,
}

impl TradingHaltRule {
    pub fn new(base: EventBase) -> Self {
        Self {
            base,
            target_markets: Vec::new(),
            trigger_change_rate: 0.0,
            halting_time_length: DEFAULT_HALTING_TIME_LENGTH,
            enabled: true,
            activation_count: 0,
            halted: BTreeMap::new(),
        }
    }

    pub fn activation_count(&self) -> u64 {
        self.activation_count
    }

    pub fn is_halted(&self, market_id: MarketId) -> bool {
        self.halted.contains_key(&market_id)
    }
}

impl Event for TradingHaltRule {
    fn base(&self) -> &EventBase {
        &self.base
    }

    fn class_name(&self) -> &str {
        "TradingHaltRule"
    }

    fn setup(&mut self, settings: &Settings, exchange: &Exchange) -> EventResult<()> {
        settings.reject_deprecated("referenceMarket", "targetMarkets")?;
        self.target_markets = resolve_targets(settings, exchange)?;
        self.trigger_change_rate = settings.required_f64("triggerChangeRate")?;
        if self.trigger_change_rate <= 0.0 {
            return Err(invalid("triggerChangeRate", "must be positive"));
        }
        if let Some(length) = settings.optional_i64("haltingTimeLength")? {
            if length < 0 {
                return Err(invalid("haltingTimeLength", "must be non-negative"));
            }
            self.halting_time_length = length;
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
        Ok(vec![
            EventHook::new(self.event_id(), HookType::Execution, false)?,
            EventHook::new(self.event_id(), HookType::Market, true)?,
        ])
    }

    fn after_execution(&mut self, exchange: &mut Exchange, log: &ExecutionLog) -> EventResult<()> {
        if !self.target_markets.contains(&log.market_id) || self.is_halted(log.market_id) {
            return Ok(());
        }
        let market = exchange.market_mut(log.market_id)?;
        let reference = market.get_market_price(0)?;
        let change = (market.market_price()? - reference).abs();
        let threshold = self.trigger_change_rate * (self.activation_count + 1) as f64 * reference;
        if change >= threshold.abs() {
            market.set_running(false);
            self.halted.insert(log.market_id, log.time);
            self.activation_count += 1;
            info!(
                "{}: market {} halted at t={} (activation {})",
                self.name(),
                log.market_id,
                log.time,
                self.activation_count
            );
        }
        Ok(())
    }

    fn before_step_for_market(&mut self, exchange: &mut Exchange, market_id: MarketId) -> EventResult<()> {
        let Some(&started) = self.halted.get(&market_id) else {
            return Ok(());
        };
        let market = exchange.market_mut(market_id)?;
        if market.is_running() {
            self.halted.remove(&market_id);
            return Ok(());
        }
        if market.get_time() > started + self.halting_time_length {
            market.set_running(true);
            self.halted.remove(&market_id);
            info!("{}: market {} resumed at t={}", self.name(), market_id, market.get_time());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{event_base, exchange, settings};
    use agora_core::{Order, Side};
    use serde_json::json;

    fn rule(exchange: &Exchange) -> TradingHaltRule {
        let mut rule = TradingHaltRule::new(event_base(0));
        rule.setup(
            &settings(json!({
                "targetMarkets": ["Market"],
                "triggerChangeRate": 0.05,
                "haltingTimeLength": 2,
            })),
            exchange,
        )
        .unwrap();
        rule
    }

    /// Trade one share at `price` on market 0 and return the execution log
    fn trade(exchange: &mut Exchange, price: f64) -> ExecutionLog {
        exchange.advance_markets().unwrap();
        let market = exchange.market_mut(0).unwrap();
        market.add_order(Order::limit(0, 0, Side::Buy, price, 1)).unwrap();
        market.add_order(Order::limit(1, 0, Side::Sell, price, 1)).unwrap();
        market.execution().unwrap().remove(0)
    }

    #[test]
    fn test_hooks() {
        let exchange = exchange(&[300.0]);
        let hooks = rule(&exchange).hook_registration().unwrap();
        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks[0].hook_type, HookType::Execution);
        assert!(!hooks[0].is_before);
        assert_eq!(hooks[1].hook_type, HookType::Market);
        assert!(hooks[1].is_before);
    }

    #[test]
    fn test_small_move_keeps_trading() {
        let mut exchange = exchange(&[300.0]);
        let mut rule = rule(&exchange);
        let log = trade(&mut exchange, 310.0);
        rule.after_execution(&mut exchange, &log).unwrap();
        assert!(exchange.market(0).unwrap().is_running());
        assert_eq!(rule.activation_count(), 0);
    }

    #[test]
    fn test_halt_and_resume() {
        let mut exchange = exchange(&[300.0]);
        let mut rule = rule(&exchange);
        let log = trade(&mut exchange, 280.0);
        rule.after_execution(&mut exchange, &log).unwrap();
        assert!(!exchange.market(0).unwrap().is_running());
        assert!(rule.is_halted(0));
        assert_eq!(rule.activation_count(), 1);

        // halted at t=1 for 2 steps: closed through t=3, open at t=4
        for expected_running in [false, false, true] {
            exchange.advance_markets().unwrap();
            rule.before_step_for_market(&mut exchange, 0).unwrap();
            assert_eq!(exchange.market(0).unwrap().is_running(), expected_running);
        }
        assert!(!rule.is_halted(0));
    }

    #[test]
    fn test_threshold_widens_after_activation() {
        let mut exchange = exchange(&[300.0]);
        let mut rule = rule(&exchange);
        let log = trade(&mut exchange, 284.0);
        rule.after_execution(&mut exchange, &log).unwrap();
        assert_eq!(rule.activation_count(), 1);

        for _ in 0..3 {
            exchange.advance_markets().unwrap();
            rule.before_step_for_market(&mut exchange, 0).unwrap();
        }
        let log = trade(&mut exchange, 280.0);
        rule.after_execution(&mut exchange, &log).unwrap();
        assert!(exchange.market(0).unwrap().is_running());
        assert_eq!(rule.activation_count(), 1);
    }

    #[test]
    fn test_reopened_market_can_halt_again() {
        let mut exchange = exchange(&[300.0]);
        let mut rule = rule(&exchange);
        let log = trade(&mut exchange, 280.0);
        rule.after_execution(&mut exchange, &log).unwrap();
        assert!(rule.is_halted(0));

        // next session opens every market before the halt runs out
        exchange.set_running_all(true);
        exchange.advance_markets().unwrap();
        rule.before_step_for_market(&mut exchange, 0).unwrap();
        assert!(!rule.is_halted(0));
        assert!(exchange.market(0).unwrap().is_running());

        let log = trade(&mut exchange, 250.0);
        rule.after_execution(&mut exchange, &log).unwrap();
        assert_eq!(rule.activation_count(), 2);
        assert!(!exchange.market(0).unwrap().is_running());
    }
}
