use agora_config::Settings;
use agora_core::{Action, MarketId, Volume};
use agora_market::{Exchange, Market};
use rand::Rng;

use crate::agent::{Agent, AgentBase};
use crate::error::invalid;
use crate::fcn::FcnAgent;
use crate::AgentResult;

/// FCN agent splitting its attention between two markets
///
/// Each step one of the two accessible markets is drawn with probability
/// proportional to its recent traded volume, and the FCN rule is applied to
/// that market only.
#[derive(Debug, Clone)]
pub struct MarketShareFcnAgent {
    fcn: FcnAgent,
}

impl MarketShareFcnAgent {
    pub fn new(base: AgentBase) -> Self {
        Self {
            fcn: FcnAgent::new(base),
        }
    }

    /// Executed volume over the last `timeWindowSize` completed steps
    pub fn sum_trade_volume(&self, market: &Market) -> AgentResult<Volume> {
        let time = market.get_time();
        let window = time.min(self.fcn.time_window_size());
        let mut volume = 0;
        for delta in 1..=window {
            volume += market.get_executed_volume(time - delta)?;
        }
        Ok(volume)
    }

    /// Index drawn with probability proportional to `weights`
    fn roulette(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let draw = total * self.fcn.base_mut().rng_mut().r#gen::<f64>();
        let mut cumulative = 0.0;
        for (position, weight) in weights.iter().enumerate() {
            cumulative += weight;
            if draw <= cumulative {
                return position;
            }
        }
        weights.len().saturating_sub(1)
    }
}

impl Agent for MarketShareFcnAgent {
    fn base(&self) -> &AgentBase {
        self.fcn.base()
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        self.fcn.base_mut()
    }

    fn class_name(&self) -> &str {
        "MarketShareFCNAgent"
    }

    fn setup(
        &mut self,
        settings: &Settings,
        accessible_markets: &[MarketId],
        exchange: &Exchange,
    ) -> AgentResult<()> {
        if accessible_markets.len() != 2 {
            return Err(invalid(
                "markets",
                format!(
                    "MarketShareFCNAgent needs exactly two markets, got {}",
                    accessible_markets.len()
                ),
            ));
        }
        self.fcn.setup(settings, accessible_markets, exchange)
    }

    fn submit_orders(&mut self, exchange: &Exchange) -> AgentResult<Vec<Action>> {
        let mut markets = Vec::new();
        let mut weights = Vec::new();
        for market_id in self.base().accessible_market_ids() {
            let market = exchange.market(market_id)?;
            weights.push(self.sum_trade_volume(market)? as f64);
            markets.push(market);
        }
        if markets.is_empty() {
            return Ok(Vec::new());
        }
        let chosen = self.roulette(&weights);
        self.fcn.submit_orders_by_market(markets[chosen])
    }
}
