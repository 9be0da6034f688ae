use agora_config::Settings;
use agora_core::{Action, MarketId, Order, Side, Time, Volume};
use agora_market::{Exchange, Market};

use crate::agent::{Agent, AgentBase};
use crate::error::invalid;
use crate::{AgentError, AgentResult};

const DEFAULT_ORDER_TIME_LENGTH: Time = 1;

/// High-frequency agent trading an index against its components
///
/// When the index market trades away from the share-weighted value of its
/// components by more than `orderThresholdPrice`, it buys the cheap side and
/// sells the expensive side at the current market prices.
#[derive(Debug, Clone)]
pub struct ArbitrageAgent {
    base: AgentBase,
    order_volume: Volume,
    order_threshold_price: f64,
    order_time_length: Time,
}

impl ArbitrageAgent {
    pub fn new(base: AgentBase) -> Self {
        Self {
            base,
            order_volume: 1,
            order_threshold_price: 0.0,
            order_time_length: DEFAULT_ORDER_TIME_LENGTH,
        }
    }

    fn submit_orders_by_index(&self, index: &Market, markets: &[Market]) -> AgentResult<Vec<Action>> {
        if !index.is_index() || !self.base.is_market_accessible(index.market_id()) {
            return Ok(Vec::new());
        }
        if !index.is_running() || !index.is_all_markets_running(markets)? {
            return Ok(Vec::new());
        }

        let components = index.components();
        let mut shares = components
            .iter()
            .map(|id| markets.get(*id).and_then(Market::outstanding_shares));
        let first = shares.next().flatten();
        if shares.any(|other| other != first) {
            return Err(AgentError::UnequalOutstandingShares(index.market_id()));
        }

        let index_value = index.get_index(index.get_time(), markets)?;
        let index_price = index.market_price()?;
        let index_side = if index_value - index_price > self.order_threshold_price {
            Side::Buy
        } else if index_price - index_value > self.order_threshold_price {
            Side::Sell
        } else {
            return Ok(Vec::new());
        };

        let agent_id = self.base.agent_id();
        let index_volume = components.len() as Volume * self.order_volume;
        let mut actions = Vec::with_capacity(components.len() + 1);
        actions.push(
            Order::limit(agent_id, index.market_id(), index_side, index_price, index_volume)
                .with_ttl(self.order_time_length)
                .into(),
        );
        for &component_id in components {
            let component = &markets[component_id];
            actions.push(
                Order::limit(
                    agent_id,
                    component_id,
                    index_side.opposite(),
                    component.market_price()?,
                    self.order_volume,
                )
                .with_ttl(self.order_time_length)
                .into(),
            );
        }
        Ok(actions)
    }
}

impl Agent for ArbitrageAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn class_name(&self) -> &str {
        "ArbitrageAgent"
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
        self.order_volume = settings.required_i64("orderVolume")?;
        if self.order_volume <= 0 {
            return Err(invalid("orderVolume", "must be positive"));
        }
        self.order_threshold_price = settings.required_f64("orderThresholdPrice")?;
        if let Some(length) = settings.optional_i64("orderTimeLength")? {
            self.order_time_length = length;
        }

        // settlement needs every traded component in the portfolio
        for &market_id in accessible_markets {
            for &component_id in exchange.market(market_id)?.components() {
                if !self.base.is_market_accessible(component_id) {
                    return Err(AgentError::NotAccessible {
                        agent_id: self.base.agent_id(),
                        market_id: component_id,
                    });
                }
            }
        }
        Ok(())
    }

    fn submit_orders(&mut self, exchange: &Exchange) -> AgentResult<Vec<Action>> {
        let mut actions = Vec::new();
        for market in exchange.markets().iter().filter(|market| market.is_index()) {
            actions.extend(self.submit_orders_by_index(market, exchange.markets())?);
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{index_exchange, settings};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn arbitrage(exchange: &Exchange) -> ArbitrageAgent {
        let mut agent = ArbitrageAgent::new(AgentBase::new(4, "Arb", StdRng::seed_from_u64(11)));
        let value = settings(json!({
            "cashAmount": 30000,
            "assetVolume": 100,
            "orderVolume": 2,
            "orderThresholdPrice": 1.0,
        }));
        agent.setup(&value, &[0, 1, 2], exchange).unwrap();
        agent
    }

    fn orders(actions: Vec<Action>) -> Vec<Order> {
        actions
            .into_iter()
            .map(|action| match action {
                Action::Order(order) => order,
                Action::Cancel(_) => panic!("arbitrage never cancels"),
            })
            .collect()
    }

    #[test]
    fn test_no_orders_when_index_is_fair() {
        let exchange = index_exchange(&[300.0, 300.0], 300.0);
        let mut agent = arbitrage(&exchange);
        assert!(agent.is_high_frequency());
        assert!(agent.submit_orders(&exchange).unwrap().is_empty());
    }

    #[test]
    fn test_cheap_index_is_bought() {
        let exchange = index_exchange(&[300.0, 310.0], 290.0);
        let mut agent = arbitrage(&exchange);
        let orders = orders(agent.submit_orders(&exchange).unwrap());

        assert_eq!(orders.len(), 3);
        assert_eq!(orders[0].market_id, 2);
        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[0].volume, 4);
        assert_eq!(orders[0].price, Some(290.0));
        assert_eq!(orders[0].ttl, Some(1));
        for (component, price) in orders[1..].iter().zip([300.0, 310.0]) {
            assert_eq!(component.side, Side::Sell);
            assert_eq!(component.volume, 2);
            assert_eq!(component.price, Some(price));
        }
    }

    #[test]
    fn test_rich_index_is_sold() {
        let exchange = index_exchange(&[300.0, 300.0], 305.0);
        let mut agent = arbitrage(&exchange);
        let orders = orders(agent.submit_orders(&exchange).unwrap());
        assert_eq!(orders[0].side, Side::Sell);
        assert!(orders[1..].iter().all(|order| order.side == Side::Buy));
    }

    #[test]
    fn test_halted_component_blocks_arbitrage() {
        let mut exchange = index_exchange(&[300.0, 300.0], 280.0);
        let mut agent = arbitrage(&exchange);
        exchange.market_mut(1).unwrap().set_running(false);
        assert!(agent.submit_orders(&exchange).unwrap().is_empty());
    }

    #[test]
    fn test_components_must_be_accessible() {
        let exchange = index_exchange(&[300.0, 300.0], 300.0);
        let mut agent = ArbitrageAgent::new(AgentBase::new(4, "Arb", StdRng::seed_from_u64(11)));
        let value = settings(json!({
            "cashAmount": 0,
            "assetVolume": 0,
            "orderVolume": 1,
            "orderThresholdPrice": 1.0,
        }));
        assert!(matches!(
            agent.setup(&value, &[0, 2], &exchange),
            Err(AgentError::NotAccessible { market_id: 1, .. })
        ));
    }
}
