use agora_config::Settings;
use agora_core::{Action, MarketId, Order, Side, Time, Volume};
use agora_market::Exchange;
use rand::Rng;

use crate::agent::{Agent, AgentBase};
use crate::AgentResult;

const MARGIN_SCALE: f64 = 10.0;
const VOLUME_SCALE: Volume = 100;
const TIME_LENGTH_SCALE: Time = 100;
const BUY_CHANCE: f64 = 0.4;
const SELL_CHANCE: f64 = 0.4;

/// Random limit orders around the market price, for smoke tests
#[derive(Debug, Clone)]
pub struct TestAgent {
    base: AgentBase,
}

impl TestAgent {
    pub fn new(base: AgentBase) -> Self {
        Self { base }
    }
}

impl Agent for TestAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn class_name(&self) -> &str {
        "TestAgent"
    }

    fn setup(
        &mut self,
        settings: &Settings,
        accessible_markets: &[MarketId],
        _exchange: &Exchange,
    ) -> AgentResult<()> {
        self.base.setup(settings, accessible_markets)
    }

    fn submit_orders(&mut self, exchange: &Exchange) -> AgentResult<Vec<Action>> {
        let agent_id = self.base.agent_id();
        let mut actions = Vec::new();
        for market_id in self.base.accessible_market_ids() {
            let market = exchange.market(market_id)?;
            let rng = self.base.rng_mut();
            let price = market.market_price()? + (rng.r#gen::<f64>() * 2.0 * MARGIN_SCALE - MARGIN_SCALE);
            let volume = rng.gen_range(1..=VOLUME_SCALE);
            let time_length = rng.gen_range(1..=TIME_LENGTH_SCALE);
            let p: f64 = rng.r#gen();
            if p < BUY_CHANCE + SELL_CHANCE {
                let side = Side::from_is_buy(p < BUY_CHANCE);
                actions.push(
                    Order::limit(agent_id, market_id, side, price, volume)
                        .with_ttl(time_length)
                        .into(),
                );
            }
        }
        Ok(actions)
    }
}
