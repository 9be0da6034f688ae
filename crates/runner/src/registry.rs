//! Class-id lookup for configuration files
//!
//! Every `class` string in a configuration maps to a constructor. The default
//! registry knows the shipped markets, agents and events; user code can add
//! its own before building a simulation.

use std::collections::HashMap;

use agora_agents::{
    Agent, AgentBase, ArbitrageAgent, FcnAgent, MarketMakerAgent, MarketShareFcnAgent, TestAgent,
};
use agora_config::{ConfigError, ConfigResult};
use agora_core::MarketId;
use agora_events::{
    Event, EventBase, FundamentalPriceShock, OrderMistakeShock, PriceLimitRule, TradingHaltRule,
};
use agora_market::{Market, MarketResult, MarketSettings};

pub type MarketFactory = fn(MarketId, &str, &MarketSettings) -> MarketResult<Market>;
pub type AgentFactory = fn(AgentBase) -> Box<dyn Agent>;
pub type EventFactory = fn(EventBase) -> Box<dyn Event>;

pub struct ClassRegistry {
    markets: HashMap<String, MarketFactory>,
    agents: HashMap<String, AgentFactory>,
    events: HashMap<String, EventFactory>,
}

impl ClassRegistry {
    /// Registry with no classes at all
    pub fn empty() -> Self {
        Self {
            markets: HashMap::new(),
            agents: HashMap::new(),
            events: HashMap::new(),
        }
    }

    /// Registering an existing class id replaces its constructor
    pub fn register_market(&mut self, class: &str, factory: MarketFactory) {
        self.markets.insert(class.to_string(), factory);
    }

    pub fn register_agent(&mut self, class: &str, factory: AgentFactory) {
        self.agents.insert(class.to_string(), factory);
    }

    pub fn register_event(&mut self, class: &str, factory: EventFactory) {
        self.events.insert(class.to_string(), factory);
    }

    pub fn market(&self, class: &str) -> ConfigResult<MarketFactory> {
        self.markets
            .get(class)
            .copied()
            .ok_or_else(|| ConfigError::UnknownClass(class.to_string()))
    }

    pub fn agent(&self, class: &str) -> ConfigResult<AgentFactory> {
        self.agents
            .get(class)
            .copied()
            .ok_or_else(|| ConfigError::UnknownClass(class.to_string()))
    }

    pub fn event(&self, class: &str) -> ConfigResult<EventFactory> {
        self.events
            .get(class)
            .copied()
            .ok_or_else(|| ConfigError::UnknownClass(class.to_string()))
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();

        registry.register_market("Market", |market_id, name, settings| {
            Market::from_settings(market_id, name, settings, false)
        });
        registry.register_market("IndexMarket", |market_id, name, settings| {
            Market::from_settings(market_id, name, settings, true)
        });

        registry.register_agent("FCNAgent", |base| Box::new(FcnAgent::new(base)));
        registry.register_agent("MarketShareFCNAgent", |base| {
            Box::new(MarketShareFcnAgent::new(base))
        });
        registry.register_agent("MarketMakerAgent", |base| Box::new(MarketMakerAgent::new(base)));
        registry.register_agent("ArbitrageAgent", |base| Box::new(ArbitrageAgent::new(base)));
        registry.register_agent("TestAgent", |base| Box::new(TestAgent::new(base)));

        registry.register_event("FundamentalPriceShock", |base| {
            Box::new(FundamentalPriceShock::new(base))
        });
        registry.register_event("OrderMistakeShock", |base| Box::new(OrderMistakeShock::new(base)));
        registry.register_event("PriceLimitRule", |base| Box::new(PriceLimitRule::new(base)));
        registry.register_event("TradingHaltRule", |base| Box::new(TradingHaltRule::new(base)));

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::Session;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn market_settings() -> MarketSettings {
        MarketSettings {
            tick_size: 0.01,
            market_price: 300.0,
            fundamental_price: 300.0,
            outstanding_shares: Some(1000),
            fundamental_drift: 0.0,
            fundamental_volatility: 0.0,
        }
    }

    #[test]
    fn test_shipped_markets() {
        let registry = ClassRegistry::default();
        let market = registry.market("Market").unwrap()(0, "Spot", &market_settings()).unwrap();
        assert!(!market.is_index());
        assert_eq!(market.name(), "Spot");

        let index = registry.market("IndexMarket").unwrap()(1, "Index", &market_settings()).unwrap();
        assert!(index.is_index());
        assert_eq!(index.outstanding_shares(), Some(1000));
    }

    #[test]
    fn test_shipped_agents() {
        let registry = ClassRegistry::default();
        for class in [
            "FCNAgent",
            "MarketShareFCNAgent",
            "MarketMakerAgent",
            "ArbitrageAgent",
            "TestAgent",
        ] {
            let base = AgentBase::new(0, "agent", StdRng::seed_from_u64(0));
            let agent = registry.agent(class).unwrap()(base);
            assert_eq!(agent.class_name(), class);
        }
    }

    #[test]
    fn test_shipped_events() {
        let registry = ClassRegistry::default();
        let session = Session::new(0, "main", 0);
        for class in [
            "FundamentalPriceShock",
            "OrderMistakeShock",
            "PriceLimitRule",
            "TradingHaltRule",
        ] {
            let base = EventBase::new(0, "event", &session, StdRng::seed_from_u64(0));
            let event = registry.event(class).unwrap()(base);
            assert_eq!(event.class_name(), class);
        }
    }

    #[test]
    fn test_unknown_class() {
        let registry = ClassRegistry::default();
        assert!(matches!(
            registry.agent("NoSuchAgent"),
            Err(ConfigError::UnknownClass(name)) if name == "NoSuchAgent"
        ));
        assert!(ClassRegistry::empty().market("Market").is_err());
    }

    #[test]
    fn test_user_classes_extend_the_registry() {
        let mut registry = ClassRegistry::empty();
        registry.register_agent("Noise", |base| Box::new(TestAgent::new(base)));
        let base = AgentBase::new(4, "noise", StdRng::seed_from_u64(0));
        let agent = registry.agent("Noise").unwrap()(base);
        assert_eq!(agent.agent_id(), 4);
    }
}
