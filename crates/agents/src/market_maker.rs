use agora_config::Settings;
use agora_core::{Action, MarketId, Order, Price, Side, Time};
use agora_market::{Exchange, MarketError};

use crate::agent::{Agent, AgentBase};
use crate::AgentResult;

const DEFAULT_ORDER_TIME_LENGTH: Time = 2;

/// High-frequency agent quoting both sides of one target market
#[derive(Debug, Clone)]
pub struct MarketMakerAgent {
    base: AgentBase,
    target_market: MarketId,
    net_interest_spread: f64,
    order_time_length: Time,
}

impl MarketMakerAgent {
    pub fn new(base: AgentBase) -> Self {
        Self {
            base,
            target_market: 0,
            net_interest_spread: 0.0,
            order_time_length: DEFAULT_ORDER_TIME_LENGTH,
        }
    }

    pub fn target_market(&self) -> MarketId {
        self.target_market
    }

    /// Midpoint of the highest bid and lowest ask across accessible markets
    fn base_price(&self, exchange: &Exchange) -> Option<Price> {
        let mut max_buy: Option<Price> = None;
        let mut min_sell: Option<Price> = None;
        for market in exchange.markets() {
            if !self.base.is_market_accessible(market.market_id()) {
                continue;
            }
            if let Some(price) = market.get_best_buy_price() {
                max_buy = Some(max_buy.map_or(price, |best| best.max(price)));
            }
            if let Some(price) = market.get_best_sell_price() {
                min_sell = Some(min_sell.map_or(price, |best| best.min(price)));
            }
        }
        Some((max_buy? + min_sell?) / 2.0)
    }
}

impl Agent for MarketMakerAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn class_name(&self) -> &str {
        "MarketMakerAgent"
    }

    fn is_high_frequency(&self) -> bool {
        true
    }

    fn setup(
        &mut self,
        settings: &Settings,
        accessible_markets: &[MarketId],
        exchange: &Exchange,
    ) -> AgentResult<()> {
        self.base.setup(settings, accessible_markets)?;
        let target = settings.required_str("targetMarket")?;
        self.target_market = exchange
            .market_id(target)
            .ok_or_else(|| MarketError::UnknownMarketName(target.to_string()))?;

        let rng = self.base.rng_mut();
        self.net_interest_spread = settings.random_f64("netInterestSpread", rng)?;
        if let Some(value) = settings.optional_random_f64("orderTimeLength", rng)? {
            self.order_time_length = value as Time;
        }
        Ok(())
    }

    fn submit_orders(&mut self, exchange: &Exchange) -> AgentResult<Vec<Action>> {
        let target = exchange.market(self.target_market)?;
        let base_price = match self.base_price(exchange) {
            Some(price) => price,
            None => target.market_price()?,
        };
        let margin = target.fundamental_price()? * self.net_interest_spread * 0.5;

        let agent_id = self.base.agent_id();
        Ok(vec![
            Order::limit(agent_id, self.target_market, Side::Buy, base_price - margin, 1)
                .with_ttl(self.order_time_length)
                .into(),
            Order::limit(agent_id, self.target_market, Side::Sell, base_price + margin, 1)
                .with_ttl(self.order_time_length)
                .into(),
        ])
    }
}
