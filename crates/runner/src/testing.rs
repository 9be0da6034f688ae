use std::collections::HashMap;

use agora_agents::{Agent, AgentBase, AgentResult};
use agora_config::Settings;
use agora_core::{Action, AgentId, MarketId, Session, Time};
use agora_fundamentals::Fundamentals;
use agora_market::{Exchange, FundamentalParams, Market};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Flat-fundamental markets in group "Market", not yet advanced
pub(crate) fn exchange(prices: &[f64]) -> Exchange {
    let mut exchange = Exchange::new(Fundamentals::new(42));
    for (id, &price) in prices.iter().enumerate() {
        let market = Market::new(id, format!("Market-{id}"), 0.01, price).unwrap();
        let params = FundamentalParams {
            initial: price,
            drift: 0.0,
            volatility: 0.0,
        };
        exchange.add_market(market, params, Some("Market")).unwrap();
    }
    exchange
}

pub(crate) fn session(start_time: Time, iteration_steps: Time, with_order_execution: bool) -> Session {
    Session {
        iteration_steps,
        with_order_placement: true,
        with_order_execution,
        with_print: false,
        max_normal_orders: 10,
        max_high_frequency_orders: 10,
        ..Session::new(0, "main", start_time)
    }
}

/// Agent replaying fixed actions keyed by the time of market 0
pub(crate) struct ScriptedAgent {
    base: AgentBase,
    script: HashMap<Time, Vec<Action>>,
    high_frequency: bool,
}

impl ScriptedAgent {
    /// 10 000 cash and 100 shares on each market
    pub(crate) fn new(agent_id: AgentId, markets: &[MarketId]) -> Self {
        let mut base = AgentBase::new(agent_id, format!("Agent-{agent_id}"), StdRng::seed_from_u64(0));
        base.set_cash_amount(10_000.0);
        for &market_id in markets {
            base.set_market_accessible(market_id).unwrap();
            base.set_asset_volume(market_id, 100).unwrap();
        }
        Self {
            base,
            script: HashMap::new(),
            high_frequency: false,
        }
    }

    pub(crate) fn high_frequency(mut self) -> Self {
        self.high_frequency = true;
        self
    }

    pub(crate) fn named(mut self, name: &str) -> Self {
        let mut base = AgentBase::new(self.base.agent_id(), name, StdRng::seed_from_u64(0));
        base.set_cash_amount(self.base.cash_amount());
        for (&market_id, &volume) in self.base.asset_volumes() {
            base.set_market_accessible(market_id).unwrap();
            base.set_asset_volume(market_id, volume).unwrap();
        }
        self.base = base;
        self
    }

    pub(crate) fn at(mut self, time: Time, action: impl Into<Action>) -> Self {
        self.script.entry(time).or_default().push(action.into());
        self
    }
}

impl Agent for ScriptedAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn class_name(&self) -> &str {
        "ScriptedAgent"
    }

    fn setup(&mut self, _settings: &Settings, _markets: &[MarketId], _exchange: &Exchange) -> AgentResult<()> {
        Ok(())
    }

    fn submit_orders(&mut self, exchange: &Exchange) -> AgentResult<Vec<Action>> {
        let time = exchange.market(0)?.get_time();
        Ok(self.script.remove(&time).unwrap_or_default())
    }

    fn is_high_frequency(&self) -> bool {
        self.high_frequency
    }
}
